const COMMANDS: &[&str] = &[
    "start",
    "stop",
    "get_proximity_state",
    "get_state",
    "get_session",
    "set_timeout",
    "get_timeout",
    "execute",
];

fn main() {
    tauri_plugin::Builder::new(COMMANDS).build();
}
