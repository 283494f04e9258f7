use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

/// Modifier keys of a global hotkey.
///
/// Carbon hotkey registration cannot tell left from right modifiers, so only the
/// generic form is modelled.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct Modifiers(u8);

impl Modifiers {
    pub const ALT: Modifiers = Modifiers(0b0000_0010);
    pub const CONTROL: Modifiers = Modifiers(0b0000_0001);
    pub const META: Modifiers = Modifiers(0b0000_1000);
    pub const SHIFT: Modifiers = Modifiers(0b0000_0100);

    pub fn empty() -> Self { Modifiers(0) }

    pub fn is_empty(&self) -> bool { self.0 == 0 }

    pub fn contains(&self, other: Modifiers) -> bool { (self.0 & other.0) == other.0 }

    pub fn insert(&mut self, other: Modifiers) { self.0 |= other.0; }

    pub fn insert_from_token(&mut self, token: &str) -> bool {
        let m = match token.to_lowercase().as_str() {
            "alt" | "option" | "opt" => Modifiers::ALT,
            "ctrl" | "control" => Modifiers::CONTROL,
            "shift" => Modifiers::SHIFT,
            "meta" | "cmd" | "command" | "super" | "win" => Modifiers::META,
            _ => return false,
        };
        self.insert(m);
        true
    }

    /// The Carbon `EventModifiers` mask (`cmdKey`, `shiftKey`, `optionKey`,
    /// `controlKey`) used by `RegisterEventHotKey`.
    pub fn carbon_mask(&self) -> u32 {
        let mut mask = 0;
        if self.contains(Modifiers::META) {
            mask |= 1 << 8;
        }
        if self.contains(Modifiers::SHIFT) {
            mask |= 1 << 9;
        }
        if self.contains(Modifiers::ALT) {
            mask |= 1 << 11;
        }
        if self.contains(Modifiers::CONTROL) {
            mask |= 1 << 12;
        }
        mask
    }
}

impl std::ops::BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Modifiers) -> Modifiers { Modifiers(self.0 | rhs.0) }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = [
            (Modifiers::CONTROL, "Ctrl"),
            (Modifiers::ALT, "Alt"),
            (Modifiers::SHIFT, "Shift"),
            (Modifiers::META, "Meta"),
        ]
        .into_iter()
        .filter(|(m, _)| self.contains(*m))
        .map(|(_, name)| name)
        .collect();
        write!(f, "{}", parts.join(" + "))
    }
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum KeyCode {
    KeyA,
    KeyB,
    KeyC,
    KeyD,
    KeyE,
    KeyF,
    KeyG,
    KeyH,
    KeyI,
    KeyJ,
    KeyK,
    KeyL,
    KeyM,
    KeyN,
    KeyO,
    KeyP,
    KeyQ,
    KeyR,
    KeyS,
    KeyT,
    KeyU,
    KeyV,
    KeyW,
    KeyX,
    KeyY,
    KeyZ,
    Digit0,
    Digit1,
    Digit2,
    Digit3,
    Digit4,
    Digit5,
    Digit6,
    Digit7,
    Digit8,
    Digit9,
    Minus,
    Equal,
    BracketLeft,
    BracketRight,
    Semicolon,
    Quote,
    Backquote,
    Backslash,
    Comma,
    Period,
    Slash,
    Enter,
    Tab,
    Space,
    Backspace,
    Escape,
    Home,
    End,
    PageUp,
    PageDown,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    ArrowLeft,
    ArrowRight,
    ArrowDown,
    ArrowUp,
}

impl KeyCode {
    /// macOS virtual key code (`kVK_*`) for an ANSI keyboard.
    pub fn virtual_keycode(self) -> u16 {
        use KeyCode::*;
        match self {
            KeyA => 0x00,
            KeyS => 0x01,
            KeyD => 0x02,
            KeyF => 0x03,
            KeyH => 0x04,
            KeyG => 0x05,
            KeyZ => 0x06,
            KeyX => 0x07,
            KeyC => 0x08,
            KeyV => 0x09,
            KeyB => 0x0B,
            KeyQ => 0x0C,
            KeyW => 0x0D,
            KeyE => 0x0E,
            KeyR => 0x0F,
            KeyY => 0x10,
            KeyT => 0x11,
            Digit1 => 0x12,
            Digit2 => 0x13,
            Digit3 => 0x14,
            Digit4 => 0x15,
            Digit6 => 0x16,
            Digit5 => 0x17,
            Equal => 0x18,
            Digit9 => 0x19,
            Digit7 => 0x1A,
            Minus => 0x1B,
            Digit8 => 0x1C,
            Digit0 => 0x1D,
            BracketRight => 0x1E,
            KeyO => 0x1F,
            KeyU => 0x20,
            BracketLeft => 0x21,
            KeyI => 0x22,
            KeyP => 0x23,
            Enter => 0x24,
            KeyL => 0x25,
            KeyJ => 0x26,
            Quote => 0x27,
            KeyK => 0x28,
            Semicolon => 0x29,
            Backslash => 0x2A,
            Comma => 0x2B,
            Slash => 0x2C,
            KeyN => 0x2D,
            KeyM => 0x2E,
            Period => 0x2F,
            Tab => 0x30,
            Space => 0x31,
            Backquote => 0x32,
            Backspace => 0x33,
            Escape => 0x35,
            F5 => 0x60,
            F6 => 0x61,
            F7 => 0x62,
            F3 => 0x63,
            F8 => 0x64,
            F9 => 0x65,
            F11 => 0x67,
            F10 => 0x6D,
            F12 => 0x6F,
            Home => 0x73,
            PageUp => 0x74,
            F4 => 0x76,
            End => 0x77,
            F2 => 0x78,
            PageDown => 0x79,
            F1 => 0x7A,
            ArrowLeft => 0x7B,
            ArrowRight => 0x7C,
            ArrowDown => 0x7D,
            ArrowUp => 0x7E,
        }
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use KeyCode::*;
        let s = match self {
            ArrowLeft => "Left",
            ArrowRight => "Right",
            ArrowUp => "Up",
            ArrowDown => "Down",
            Minus => "-",
            Equal => "=",
            BracketLeft => "[",
            BracketRight => "]",
            Semicolon => ";",
            Quote => "'",
            Backquote => "`",
            Backslash => "\\",
            Comma => ",",
            Period => ".",
            Slash => "/",
            other => {
                let name = format!("{other:?}");
                let short = name
                    .strip_prefix("Key")
                    .or_else(|| name.strip_prefix("Digit"))
                    .unwrap_or(&name)
                    .to_string();
                return f.write_str(&short);
            }
        };
        f.write_str(s)
    }
}

impl FromStr for KeyCode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use KeyCode::*;
        let upper = s.trim().to_uppercase();
        let key = match upper.as_str() {
            "A" => KeyA,
            "B" => KeyB,
            "C" => KeyC,
            "D" => KeyD,
            "E" => KeyE,
            "F" => KeyF,
            "G" => KeyG,
            "H" => KeyH,
            "I" => KeyI,
            "J" => KeyJ,
            "K" => KeyK,
            "L" => KeyL,
            "M" => KeyM,
            "N" => KeyN,
            "O" => KeyO,
            "P" => KeyP,
            "Q" => KeyQ,
            "R" => KeyR,
            "S" => KeyS,
            "T" => KeyT,
            "U" => KeyU,
            "V" => KeyV,
            "W" => KeyW,
            "X" => KeyX,
            "Y" => KeyY,
            "Z" => KeyZ,
            "0" => Digit0,
            "1" => Digit1,
            "2" => Digit2,
            "3" => Digit3,
            "4" => Digit4,
            "5" => Digit5,
            "6" => Digit6,
            "7" => Digit7,
            "8" => Digit8,
            "9" => Digit9,
            "-" | "MINUS" | "HYPHEN" => Minus,
            "=" | "EQUAL" | "EQUALS" => Equal,
            "[" | "BRACKETLEFT" | "LEFTBRACKET" => BracketLeft,
            "]" | "BRACKETRIGHT" | "RIGHTBRACKET" => BracketRight,
            ";" | "SEMICOLON" => Semicolon,
            "'" | "QUOTE" | "APOSTROPHE" => Quote,
            "`" | "BACKQUOTE" | "GRAVE" | "TILDE" => Backquote,
            "\\" | "BACKSLASH" => Backslash,
            "," | "COMMA" => Comma,
            "." | "DOT" | "PERIOD" => Period,
            "/" | "SLASH" => Slash,
            "ENTER" | "RETURN" => Enter,
            "TAB" => Tab,
            "SPACE" => Space,
            "BACKSPACE" => Backspace,
            "ESC" | "ESCAPE" => Escape,
            "HOME" => Home,
            "END" => End,
            "PAGEUP" => PageUp,
            "PAGEDOWN" => PageDown,
            "F1" => F1,
            "F2" => F2,
            "F3" => F3,
            "F4" => F4,
            "F5" => F5,
            "F6" => F6,
            "F7" => F7,
            "F8" => F8,
            "F9" => F9,
            "F10" => F10,
            "F11" => F11,
            "F12" => F12,
            "LEFT" | "ARROWLEFT" => ArrowLeft,
            "RIGHT" | "ARROWRIGHT" => ArrowRight,
            "UP" | "ARROWUP" => ArrowUp,
            "DOWN" | "ARROWDOWN" => ArrowDown,
            _ => return Err(anyhow!("Unrecognized key token: {}", s)),
        };
        Ok(key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hotkey {
    pub modifiers: Modifiers,
    pub key_code: KeyCode,
}

impl Hotkey {
    pub fn new(modifiers: Modifiers, key_code: KeyCode) -> Self { Self { modifiers, key_code } }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.is_empty() {
            write!(f, "{}", self.key_code)
        } else {
            write!(f, "{} + {}", self.modifiers, self.key_code)
        }
    }
}

impl FromStr for Hotkey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut mods = Modifiers::empty();
        let mut key = None;
        for part in s.split('+').map(str::trim).filter(|p| !p.is_empty()) {
            if mods.insert_from_token(part) {
                continue;
            }
            if key.is_some() {
                return Err(anyhow!("More than one key in hotkey: {}", s));
            }
            key = Some(KeyCode::from_str(part)?);
        }
        let key_code = key.ok_or_else(|| anyhow!("No key specified in hotkey: {}", s))?;
        Ok(Hotkey::new(mods, key_code))
    }
}

impl Serialize for Hotkey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Hotkey {
    fn deserialize<D>(deserializer: D) -> Result<Hotkey, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum HotkeyRepr {
            Str(String),
            Map {
                modifiers: Modifiers,
                key_code: KeyCode,
            },
        }

        match HotkeyRepr::deserialize(deserializer)? {
            HotkeyRepr::Str(s) => Hotkey::from_str(&s).map_err(serde::de::Error::custom),
            HotkeyRepr::Map { modifiers, key_code } => Ok(Hotkey::new(modifiers, key_code)),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parses_modifier_chords() {
        let hk: Hotkey = "Ctrl + Alt + Shift + Left".parse().unwrap();
        assert!(hk.modifiers.contains(Modifiers::CONTROL));
        assert!(hk.modifiers.contains(Modifiers::ALT));
        assert!(hk.modifiers.contains(Modifiers::SHIFT));
        assert!(!hk.modifiers.contains(Modifiers::META));
        assert_eq!(hk.key_code, KeyCode::ArrowLeft);
    }

    #[test]
    fn parsing_is_case_and_space_insensitive() {
        let a: Hotkey = "ctrl+option+space".parse().unwrap();
        let b: Hotkey = "Ctrl + Alt + Space".parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_missing_or_duplicate_keys() {
        assert!("Ctrl + Alt".parse::<Hotkey>().is_err());
        assert!("Ctrl + A + B".parse::<Hotkey>().is_err());
        assert!("Ctrl + Banana".parse::<Hotkey>().is_err());
    }

    #[test]
    fn display_round_trips() {
        for s in ["Ctrl + Alt + Left", "Ctrl + Alt + Shift + Down", "Meta + 1", "F5", "Alt + /"] {
            let hk: Hotkey = s.parse().unwrap();
            assert_eq!(hk.to_string(), s);
            assert_eq!(hk.to_string().parse::<Hotkey>().unwrap(), hk);
        }
    }

    #[test]
    fn carbon_masks() {
        let hk: Hotkey = "Cmd + Shift + Alt + Ctrl + A".parse().unwrap();
        assert_eq!(hk.modifiers.carbon_mask(), 0x0100 | 0x0200 | 0x0800 | 0x1000);
        assert_eq!(Modifiers::empty().carbon_mask(), 0);
    }

    #[test]
    fn arrow_virtual_keycodes() {
        assert_eq!(KeyCode::ArrowLeft.virtual_keycode(), 0x7B);
        assert_eq!(KeyCode::ArrowRight.virtual_keycode(), 0x7C);
        assert_eq!(KeyCode::ArrowDown.virtual_keycode(), 0x7D);
        assert_eq!(KeyCode::ArrowUp.virtual_keycode(), 0x7E);
        assert_eq!(KeyCode::Space.virtual_keycode(), 0x31);
    }

    #[test]
    fn deserializes_from_string_or_map() {
        #[derive(Deserialize)]
        struct Wrapper {
            key: Hotkey,
        }
        let w: Wrapper = toml::from_str(r#"key = "Ctrl + Alt + Up""#).unwrap();
        assert_eq!(w.key, Hotkey::new(Modifiers::CONTROL | Modifiers::ALT, KeyCode::ArrowUp));
    }
}
