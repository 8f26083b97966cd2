/// Host keyboard keys a front end can forward to an emulated machine.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    A,
    S,
    X,
    Z,
    Enter,
    Space,
    Escape,
}

impl Key {
    /// Parses a key name as typed on a command line, case-insensitively.
    pub fn from_name(name: &str) -> Option<Key> {
        let key = match name.to_ascii_lowercase().as_str() {
            "up" => Key::Up,
            "down" => Key::Down,
            "left" => Key::Left,
            "right" => Key::Right,
            "a" => Key::A,
            "s" => Key::S,
            "x" => Key::X,
            "z" => Key::Z,
            "enter" | "return" => Key::Enter,
            "space" => Key::Space,
            "escape" | "esc" => Key::Escape,
            _ => {
                log::debug!("unknown key name '{name}'");
                return None;
            }
        };
        Some(key)
    }
}
