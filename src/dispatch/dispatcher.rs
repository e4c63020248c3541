//! # Command Dispatcher
//!
//! The real-time control loop. Every period it reads the newest controller
//! snapshot, handles the takeoff/land toggle, maps the sticks to a
//! [`VelocityCommand`] and sends it.
//!
//! A command goes out on every tick, including all-zero hover commands and
//! repeats of the previous command. A single lost datagram is corrected on the
//! next tick, and the vehicle never keeps flying on a stale command because the
//! stick went back to center and nothing was sent.
//!
//! ## Disconnected Controller
//!
//! While the input snapshot reports the controller disconnected, the frozen
//! stick values are ignored and HOVER is sent. If the vehicle is airborne and
//! the controller stays away for `failsafe_land_after`, one landing is issued.
//!
//! ## Shutdown
//!
//! A takeoff or landing still in progress gets up to [`ACTION_GRACE`] to
//! finish. A landing that did not complete is reported as `Airborne` so the
//! caller lands the vehicle itself.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::command::{map_controller, VelocityCommand};
use super::toggle::{FlightAction, FlightState, ToggleDetector};
use crate::config::DispatchConfig;
use crate::controller::mapper::ControllerState;
use crate::vehicle::Vehicle;

/// Number of ticks between status log messages (10 s at 20 Hz)
pub const LOG_INTERVAL_TICKS: u64 = 200;

/// How long shutdown waits for a takeoff or landing already in progress
pub const ACTION_GRACE: Duration = Duration::from_secs(2);

/// What one tick decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickPlan {
    pub command: VelocityCommand,
    pub action: Option<FlightAction>,
    /// True when HOVER replaced the controller input.
    pub failsafe: bool,
}

/// Per-tick decision logic, free of I/O and wall-clock reads.
#[derive(Debug, Clone)]
pub struct ControlLoop {
    toggle: ToggleDetector,
    flight: FlightState,
    failsafe_land_after: Option<Duration>,
    disconnected_since: Option<Instant>,
    failsafe_landed: bool,
}

impl ControlLoop {
    #[must_use]
    pub fn new(config: &DispatchConfig) -> Self {
        Self {
            toggle: ToggleDetector::new(config.toggle_debounce()),
            flight: FlightState::Grounded,
            failsafe_land_after: config.failsafe_land_after(),
            disconnected_since: None,
            failsafe_landed: false,
        }
    }

    pub fn flight_state(&self) -> FlightState {
        self.flight
    }

    /// Decide what to send for `state` observed at `now`.
    pub fn tick(&mut self, state: &ControllerState, now: Instant) -> TickPlan {
        if !state.connected {
            return self.disconnected_tick(now);
        }

        if self.disconnected_since.take().is_some() {
            self.toggle.reset_level();
            self.failsafe_landed = false;
        }

        let action = if self.toggle.update(state.btn_start, now) {
            let (action, next) = self.flight.toggle();
            self.flight = next;
            Some(action)
        } else {
            None
        };

        TickPlan {
            command: map_controller(state),
            action,
            failsafe: false,
        }
    }

    fn disconnected_tick(&mut self, now: Instant) -> TickPlan {
        let since = *self.disconnected_since.get_or_insert(now);

        let land_due = self
            .failsafe_land_after
            .map(|after| now.duration_since(since) >= after)
            .unwrap_or(false);

        let action = if land_due && !self.failsafe_landed && self.flight == FlightState::Airborne {
            self.failsafe_landed = true;
            self.flight = FlightState::Grounded;
            Some(FlightAction::Land)
        } else {
            None
        };

        TickPlan {
            command: VelocityCommand::HOVER,
            action,
            failsafe: true,
        }
    }
}

/// Counters for the periodic status line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStats {
    pub ticks: u64,
    pub sent: u64,
    pub failed: u64,
    pub failsafe_ticks: u64,
}

/// Periodic sender of velocity commands.
pub struct CommandDispatcher {
    vehicle: Arc<dyn Vehicle>,
    input: watch::Receiver<ControllerState>,
    logic: ControlLoop,
    period: Duration,
    stats: DispatchStats,
    consecutive_failures: u64,
    /// Latest takeoff/land request; the task yields true when it succeeded.
    in_flight: Option<(FlightAction, JoinHandle<bool>)>,
}

impl CommandDispatcher {
    pub fn new(
        vehicle: Arc<dyn Vehicle>,
        input: watch::Receiver<ControllerState>,
        config: &DispatchConfig,
    ) -> Self {
        Self {
            vehicle,
            input,
            logic: ControlLoop::new(config),
            period: config.period(),
            stats: DispatchStats::default(),
            consecutive_failures: 0,
            in_flight: None,
        }
    }

    /// Run until `shutdown` turns true (or its sender is dropped).
    ///
    /// Sends one last HOVER on the way out and returns the flight state the
    /// dispatcher believes the vehicle is in, so the caller can land it.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> FlightState {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Dispatching velocity commands every {:?}", self.period);

        while !*shutdown.borrow() {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = ticker.tick() => self.tick().await,
            }
        }

        if let Err(e) = self.vehicle.send_velocity(VelocityCommand::HOVER).await {
            warn!("Final hover command failed: {}", e);
        }

        let flight_state = self.finish_in_flight().await;

        info!(
            "Dispatcher stopped after {} ticks ({} sent, {} failed, {} failsafe)",
            self.stats.ticks, self.stats.sent, self.stats.failed, self.stats.failsafe_ticks
        );
        flight_state
    }

    /// Wait out the last takeoff/land request and work out the final state.
    async fn finish_in_flight(&mut self) -> FlightState {
        let believed = self.logic.flight_state();
        let Some((action, mut task)) = self.in_flight.take() else {
            return believed;
        };

        let completed = match tokio::time::timeout(ACTION_GRACE, &mut task).await {
            Ok(Ok(succeeded)) => succeeded,
            Ok(Err(e)) => {
                warn!("{:?} task failed: {}", action, e);
                false
            }
            Err(_) => {
                warn!("{:?} still pending after {:?}, abandoning it", action, ACTION_GRACE);
                task.abort();
                false
            }
        };

        if action == FlightAction::Land && !completed {
            FlightState::Airborne
        } else {
            believed
        }
    }

    async fn tick(&mut self) {
        let state = *self.input.borrow();
        let plan = self.logic.tick(&state, Instant::now());

        if plan.failsafe {
            if self.stats.failsafe_ticks % LOG_INTERVAL_TICKS == 0 {
                debug!("Controller disconnected, sending hover");
            }
            self.stats.failsafe_ticks += 1;
        }

        if let Some(action) = plan.action {
            self.dispatch_action(action, plan.failsafe);
        }

        match self.vehicle.send_velocity(plan.command).await {
            Ok(()) => {
                if self.consecutive_failures > 0 {
                    info!("Vehicle accepting commands again after {} failures", self.consecutive_failures);
                    self.consecutive_failures = 0;
                }
                self.stats.sent += 1;
            }
            Err(e) => {
                self.consecutive_failures += 1;
                self.stats.failed += 1;
                if self.consecutive_failures == 1 {
                    warn!("Failed to send velocity command: {}", e);
                } else {
                    debug!("Failed to send velocity command: {}", e);
                }
            }
        }

        self.stats.ticks += 1;
        if self.stats.ticks % LOG_INTERVAL_TICKS == 0 {
            info!(
                "Sent {} commands ({} failed), flight state {:?}",
                self.stats.sent,
                self.stats.failed,
                self.logic.flight_state()
            );
        }
    }

    /// Fire-and-forget takeoff or landing; the loop does not wait for it.
    fn dispatch_action(&mut self, action: FlightAction, failsafe: bool) {
        if failsafe {
            warn!("Controller lost while airborne, landing");
        } else {
            info!("Toggle pressed: {:?}", action);
        }

        let vehicle = Arc::clone(&self.vehicle);
        let task = tokio::spawn(async move {
            let result = match action {
                FlightAction::Takeoff => vehicle.takeoff().await,
                FlightAction::Land => vehicle.land().await,
            };
            match result {
                Ok(()) => {
                    info!("{:?} completed", action);
                    true
                }
                Err(e) => {
                    warn!("{:?} failed: {}", action, e);
                    false
                }
            }
        });
        self.in_flight = Some((action, task));
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::mocks::MockVehicle;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn config() -> DispatchConfig {
        DispatchConfig::default()
    }

    fn pressed(start: bool) -> ControllerState {
        ControllerState {
            btn_start: start,
            ..ControllerState::default()
        }
    }

    fn disconnected() -> ControllerState {
        ControllerState {
            right_stick_x: 80,
            connected: false,
            ..ControllerState::default()
        }
    }

    struct Harness {
        vehicle: MockVehicle,
        input: watch::Sender<ControllerState>,
        shutdown: watch::Sender<bool>,
        task: JoinHandle<FlightState>,
    }

    fn spawn_dispatcher(config: DispatchConfig) -> Harness {
        let vehicle = MockVehicle::new();
        let (input, input_rx) = watch::channel(ControllerState::default());
        let (shutdown, shutdown_rx) = watch::channel(false);
        let dispatcher = CommandDispatcher::new(Arc::new(vehicle.clone()), input_rx, &config);
        let task = tokio::spawn(dispatcher.run(shutdown_rx));
        Harness {
            vehicle,
            input,
            shutdown,
            task,
        }
    }

    impl Harness {
        async fn stop(self) -> (MockVehicle, FlightState) {
            self.shutdown.send(true).unwrap();
            let state = self.task.await.unwrap();
            (self.vehicle, state)
        }
    }

    // ==================== ControlLoop Tests ====================

    #[test]
    fn test_neutral_tick_is_hover() {
        let mut logic = ControlLoop::new(&config());
        let plan = logic.tick(&ControllerState::default(), Instant::now());
        assert_eq!(plan.command, VelocityCommand::HOVER);
        assert_eq!(plan.action, None);
        assert!(!plan.failsafe);
    }

    #[test]
    fn test_single_press_takes_off_once() {
        let mut logic = ControlLoop::new(&config());
        let t0 = Instant::now();

        let plan = logic.tick(&pressed(true), t0);
        assert_eq!(plan.action, Some(FlightAction::Takeoff));
        assert_eq!(logic.flight_state(), FlightState::Airborne);

        // Held for a full second
        for i in 1..=20 {
            assert_eq!(logic.tick(&pressed(true), t0 + ms(i * 50)).action, None);
        }
        assert_eq!(logic.flight_state(), FlightState::Airborne);
    }

    #[test]
    fn test_second_press_lands() {
        let mut logic = ControlLoop::new(&config());
        let t0 = Instant::now();

        logic.tick(&pressed(true), t0);
        logic.tick(&pressed(false), t0 + ms(200));
        let plan = logic.tick(&pressed(true), t0 + ms(400));

        assert_eq!(plan.action, Some(FlightAction::Land));
        assert_eq!(logic.flight_state(), FlightState::Grounded);
    }

    #[test]
    fn test_toggle_tick_still_carries_sticks() {
        let mut logic = ControlLoop::new(&config());
        let state = ControllerState {
            btn_start: true,
            left_stick_y: 40,
            ..ControllerState::default()
        };

        let plan = logic.tick(&state, Instant::now());
        assert_eq!(plan.action, Some(FlightAction::Takeoff));
        assert_eq!(plan.command.vertical(), 40);
    }

    #[test]
    fn test_disconnected_sends_hover_not_frozen_values() {
        let mut logic = ControlLoop::new(&config());
        let plan = logic.tick(&disconnected(), Instant::now());
        assert_eq!(plan.command, VelocityCommand::HOVER);
        assert!(plan.failsafe);
    }

    #[test]
    fn test_disconnected_while_airborne_lands_once_after_timeout() {
        let mut logic = ControlLoop::new(&config());
        let t0 = Instant::now();
        logic.tick(&pressed(true), t0);
        assert_eq!(logic.flight_state(), FlightState::Airborne);

        let lost = t0 + ms(1000);
        assert_eq!(logic.tick(&disconnected(), lost).action, None);
        assert_eq!(logic.tick(&disconnected(), lost + ms(4950)).action, None);
        assert_eq!(
            logic.tick(&disconnected(), lost + ms(5000)).action,
            Some(FlightAction::Land)
        );
        assert_eq!(logic.tick(&disconnected(), lost + ms(9000)).action, None);
        assert_eq!(logic.flight_state(), FlightState::Grounded);
    }

    #[test]
    fn test_disconnected_while_grounded_never_lands() {
        let mut logic = ControlLoop::new(&config());
        let t0 = Instant::now();
        for i in 0..200 {
            assert_eq!(logic.tick(&disconnected(), t0 + ms(i * 50)).action, None);
        }
    }

    #[test]
    fn test_failsafe_land_disabled() {
        let mut cfg = config();
        cfg.failsafe_land_after_ms = 0;
        let mut logic = ControlLoop::new(&cfg);
        let t0 = Instant::now();
        logic.tick(&pressed(true), t0);

        assert_eq!(logic.tick(&disconnected(), t0 + ms(100)).action, None);
        assert_eq!(logic.tick(&disconnected(), t0 + ms(600_000)).action, None);
        assert_eq!(logic.flight_state(), FlightState::Airborne);
    }

    #[test]
    fn test_reconnect_with_button_held_does_not_toggle() {
        let mut logic = ControlLoop::new(&config());
        let t0 = Instant::now();

        logic.tick(&disconnected(), t0);
        let plan = logic.tick(&pressed(true), t0 + ms(1000));
        assert_eq!(plan.action, None);
        assert!(!plan.failsafe);
        assert_eq!(logic.flight_state(), FlightState::Grounded);
    }

    // ==================== CommandDispatcher Tests ====================

    #[tokio::test(start_paused = true)]
    async fn test_neutral_input_sends_hover_every_period() {
        let harness = spawn_dispatcher(config());

        // Ticks at 0, 50, ..., 500 ms
        tokio::time::sleep(ms(525)).await;
        let before_stop = harness.vehicle.sent();
        assert_eq!(before_stop.len(), 11);
        assert!(before_stop.iter().all(VelocityCommand::is_hover));

        let (vehicle, state) = harness.stop().await;
        assert_eq!(state, FlightState::Grounded);
        // Final hover on shutdown
        assert_eq!(vehicle.sent().len(), 12);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stick_input_reaches_next_tick() {
        let harness = spawn_dispatcher(config());
        tokio::time::sleep(ms(10)).await;

        harness.input.send_replace(ControllerState {
            right_stick_x: 50,
            ..ControllerState::default()
        });
        tokio::time::sleep(ms(50)).await;

        let sent = harness.vehicle.sent();
        let last = sent.last().copied().unwrap();
        assert_eq!(last.lateral(), 50);
        assert_eq!(last.forward_back(), 0);

        harness.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_held_toggle_dispatches_one_takeoff() {
        let harness = spawn_dispatcher(config());

        harness.input.send_replace(pressed(true));
        tokio::time::sleep(ms(1000)).await;
        assert_eq!(harness.vehicle.takeoff_count(), 1);
        assert_eq!(harness.vehicle.land_count(), 0);

        harness.input.send_replace(pressed(false));
        tokio::time::sleep(ms(200)).await;
        harness.input.send_replace(pressed(true));
        tokio::time::sleep(ms(200)).await;
        assert_eq!(harness.vehicle.land_count(), 1);

        let (_, state) = harness.stop().await;
        assert_eq!(state, FlightState::Grounded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reports_airborne_at_shutdown() {
        let harness = spawn_dispatcher(config());
        harness.input.send_replace(pressed(true));
        tokio::time::sleep(ms(100)).await;

        let (_, state) = harness.stop().await;
        assert_eq!(state, FlightState::Airborne);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_failures_do_not_stop_loop() {
        let harness = spawn_dispatcher(config());

        harness.vehicle.set_send_error(true);
        tokio::time::sleep(ms(300)).await;
        assert!(harness.vehicle.sent().is_empty());

        harness.vehicle.set_send_error(false);
        tokio::time::sleep(ms(300)).await;
        assert!(harness.vehicle.sent().len() >= 5);

        harness.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_sent_command_in_range() {
        let harness = spawn_dispatcher(config());

        for value in [-100, -50, 0, 37, 100] {
            harness.input.send_replace(ControllerState {
                left_stick_x: value,
                left_stick_y: -value,
                right_stick_x: value,
                right_stick_y: -value,
                ..ControllerState::default()
            });
            tokio::time::sleep(ms(60)).await;
        }

        let (vehicle, _) = harness.stop().await;
        for command in vehicle.sent() {
            for axis in command.axes() {
                assert!((-100..=100).contains(&axis));
            }
        }
    }

    async fn press_takeoff_then_land(harness: &Harness) {
        harness.input.send_replace(pressed(true));
        tokio::time::sleep(ms(200)).await;
        harness.input.send_replace(pressed(false));
        tokio::time::sleep(ms(200)).await;
        harness.input.send_replace(pressed(true));
        tokio::time::sleep(ms(60)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_waits_for_slow_landing() {
        let harness = spawn_dispatcher(config());
        harness.vehicle.set_motion_delay(ms(300));
        press_takeoff_then_land(&harness).await;
        assert_eq!(harness.vehicle.land_count(), 0);

        let (vehicle, state) = harness.stop().await;
        assert_eq!(vehicle.land_count(), 1);
        assert_eq!(state, FlightState::Grounded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unfinished_landing_reported_airborne() {
        let harness = spawn_dispatcher(config());
        harness.vehicle.set_motion_delay(ACTION_GRACE * 5);
        harness.input.send_replace(pressed(true));
        tokio::time::sleep(ACTION_GRACE * 6).await;
        assert_eq!(harness.vehicle.takeoff_count(), 1);

        harness.input.send_replace(pressed(false));
        tokio::time::sleep(ms(200)).await;
        harness.input.send_replace(pressed(true));
        tokio::time::sleep(ms(60)).await;

        let (vehicle, state) = harness.stop().await;
        assert_eq!(vehicle.land_count(), 0);
        assert_eq!(state, FlightState::Airborne);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_landing_reported_airborne() {
        let harness = spawn_dispatcher(config());
        harness.vehicle.set_land_error(true);
        press_takeoff_then_land(&harness).await;

        let (_, state) = harness.stop().await;
        assert_eq!(state, FlightState::Airborne);
    }

    #[tokio::test]
    async fn test_shutdown_before_start() {
        let vehicle = MockVehicle::new();
        let (_input, input_rx) = watch::channel(ControllerState::default());
        let (_shutdown, shutdown_rx) = watch::channel(true);

        let dispatcher = CommandDispatcher::new(Arc::new(vehicle.clone()), input_rx, &config());
        assert_eq!(dispatcher.stats(), DispatchStats::default());
        let state = dispatcher.run(shutdown_rx).await;

        assert_eq!(state, FlightState::Grounded);
        assert_eq!(vehicle.sent(), vec![VelocityCommand::HOVER]);
    }
}
