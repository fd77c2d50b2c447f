//! Remote command dispatch.  Parse a command line and produce the reply.

use tracing::{info, warn};

use crate::emergency::EmergencyState;
use crate::state::DeviceState;

/// Run one command line and return its reply (without trailing newline).
///
/// Input is trimmed and upper-cased before matching.  Rejections are plain
/// replies, never errors.
pub fn process_command(state: &mut DeviceState, raw: &str) -> String {
    let command = raw.trim().to_ascii_uppercase();

    if let Some(value) = command.strip_prefix("SET_MINBLINK:") {
        handle_set_min_blink(state, value)
    } else if let Some(value) = command.strip_prefix("SET_BLINKINT:") {
        handle_set_blink_interval(state, value)
    } else if command == "STATUS" {
        handle_status(state)
    } else {
        warn!(command = %command, "unknown remote command");
        "Unknown command".to_string()
    }
}

fn handle_set_min_blink(state: &mut DeviceState, value: &str) -> String {
    let parsed = value.trim().parse::<u32>().ok();
    let applied = parsed.and_then(|ms| {
        state
            .controller
            .blink_config_mut()
            .set_blink_duration(ms)
            .map(|()| ms)
            .map_err(|e| warn!("rejected min blink duration: {}", e))
            .ok()
    });
    match applied {
        Some(ms) => {
            info!(blink_duration_ms = ms, "min blink duration updated");
            state.persist_settings();
            format!("Min blink duration updated to: {}", ms)
        }
        None => "Invalid min blink duration".to_string(),
    }
}

fn handle_set_blink_interval(state: &mut DeviceState, value: &str) -> String {
    let parsed = value.trim().parse::<u32>().ok();
    let applied = parsed.and_then(|ms| {
        state
            .controller
            .blink_config_mut()
            .set_blink_gap(ms)
            .map(|()| ms)
            .map_err(|e| warn!("rejected blink interval: {}", e))
            .ok()
    });
    match applied {
        Some(ms) => {
            info!(blink_gap_ms = ms, "blink interval updated");
            state.persist_settings();
            format!("Blink interval updated to: {}", ms)
        }
        None => "Invalid blink interval".to_string(),
    }
}

fn handle_status(state: &DeviceState) -> String {
    let ctl = &state.controller;
    let emergency = match ctl.emergency_state() {
        EmergencyState::Idle => "idle",
        EmergencyState::Active { .. } => "active",
    };
    [
        format!("Min Blink Duration: {}", ctl.blink_config().blink_duration_ms()),
        format!("Blink Interval: {}", ctl.blink_config().blink_gap_ms()),
        format!("User ID: {}", ctl.user_id()),
        format!("Emergency: {}", emergency),
        format!("Mode: {}", ctl.selection().mode.as_str()),
        format!("Message: {}", ctl.message()),
        format!("Clients: {}", state.remote.clients.len()),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigStore, MemoryStore};

    fn state_with(store: MemoryStore) -> DeviceState {
        DeviceState::for_test(Box::new(store))
    }

    #[test]
    fn test_set_min_blink_accepts_and_persists() {
        let store = MemoryStore::new();
        let mut state = state_with(store.clone());
        let reply = process_command(&mut state, "SET_MINBLINK:500");
        assert_eq!(reply, "Min blink duration updated to: 500");
        assert_eq!(state.controller.blink_config().blink_duration_ms(), 500);
        assert_eq!(
            store.saved().map(|s| s.blink.blink_duration_ms()),
            Some(500),
            "accepted value must be persisted"
        );
    }

    #[test]
    fn test_set_min_blink_below_range_rejected() {
        let store = MemoryStore::new();
        let mut state = state_with(store.clone());
        let reply = process_command(&mut state, "SET_MINBLINK:50");
        assert_eq!(reply, "Invalid min blink duration");
        assert_eq!(state.controller.blink_config().blink_duration_ms(), 400);
        assert_eq!(store.saved(), None, "rejected value must not be persisted");
    }

    #[test]
    fn test_set_min_blink_bounds_inclusive() {
        let mut state = state_with(MemoryStore::new());
        assert_eq!(
            process_command(&mut state, "SET_MINBLINK:100"),
            "Min blink duration updated to: 100"
        );
        assert_eq!(
            process_command(&mut state, "SET_MINBLINK:5000"),
            "Min blink duration updated to: 5000"
        );
        assert_eq!(
            process_command(&mut state, "SET_MINBLINK:5001"),
            "Invalid min blink duration"
        );
    }

    #[test]
    fn test_non_numeric_value_rejected() {
        let mut state = state_with(MemoryStore::new());
        assert_eq!(process_command(&mut state, "SET_MINBLINK:abc"), "Invalid min blink duration");
        assert_eq!(process_command(&mut state, "SET_BLINKINT:"), "Invalid blink interval");
        assert_eq!(process_command(&mut state, "SET_BLINKINT:-5"), "Invalid blink interval");
    }

    #[test]
    fn test_set_blink_interval() {
        let mut state = state_with(MemoryStore::new());
        assert_eq!(
            process_command(&mut state, "  set_blinkint:2000 \r"),
            "Blink interval updated to: 2000",
            "input is trimmed and upper-cased"
        );
        assert_eq!(state.controller.blink_config().blink_gap_ms(), 2000);
        assert_eq!(process_command(&mut state, "SET_BLINKINT:150"), "Invalid blink interval");
        assert_eq!(process_command(&mut state, "SET_BLINKINT:10001"), "Invalid blink interval");
        assert_eq!(state.controller.blink_config().blink_gap_ms(), 2000);
    }

    #[test]
    fn test_persist_failure_keeps_new_value() {
        let mut state = state_with(MemoryStore::failing());
        assert_eq!(
            process_command(&mut state, "SET_MINBLINK:600"),
            "Min blink duration updated to: 600"
        );
        assert_eq!(state.controller.blink_config().blink_duration_ms(), 600);
    }

    #[test]
    fn test_status_reply() {
        let mut store = MemoryStore::new();
        let mut settings = store.load().unwrap();
        settings.user_id = 9;
        let mut state = state_with(MemoryStore::with_settings(settings));
        let reply = process_command(&mut state, "status");
        let lines: Vec<&str> = reply.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Min Blink Duration: 400",
                "Blink Interval: 1200",
                "User ID: 9",
                "Emergency: idle",
                "Mode: grid",
                "Message: ",
                "Clients: 0",
            ]
        );
    }

    #[test]
    fn test_unknown_command() {
        let mut state = state_with(MemoryStore::new());
        assert_eq!(process_command(&mut state, "REBOOT"), "Unknown command");
        assert_eq!(process_command(&mut state, "SET_MINBLINK"), "Unknown command");
    }
}
