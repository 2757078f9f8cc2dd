use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};
use tracing::trace;

/// Single line text input driven by raw key events. The cursor is counted in chars.
#[derive(Default)]
pub struct Inputter {
    current_input: String,
    curser_pos: usize,
    finished: bool,
    canceled: bool,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct InputResult {
    pub input: String,
    pub finished: bool,
    pub canceled: bool,
    pub curser_pos: usize,
    pub changed: bool,
}

impl Inputter {
    pub fn read(&mut self, key: event::KeyEvent) -> InputResult {
        let before = self.current_input.clone();
        match (key.code, key.modifiers) {
            (KeyCode::Enter, _) => self.finished = true,
            (KeyCode::Esc, _) => {
                self.current_input.clear();
                self.curser_pos = 0;
                self.canceled = true;
                self.finished = true;
            }
            (KeyCode::Backspace, _) => self.backspace(),
            (KeyCode::Delete, _) => self.delete(),
            (KeyCode::Left, _) => self.curser_pos = self.curser_pos.saturating_sub(1),
            (KeyCode::Right, _) => {
                self.curser_pos = std::cmp::min(self.curser_pos + 1, self.len());
            }
            (KeyCode::Home, _) => self.curser_pos = 0,
            (KeyCode::End, _) => self.curser_pos = self.len(),
            (KeyCode::Char(chr), KeyModifiers::NONE | KeyModifiers::SHIFT) => {
                self.current_input.insert(self.byte_pos(), chr);
                self.curser_pos += 1;
            }
            (code, modifiers) => trace!("Ignored input key {code:?} {modifiers:?}"),
        }
        let mut result = self.get();
        result.changed = before != self.current_input;
        result
    }

    /// Starts a new input prefilled with `s`, cursor at its end.
    pub fn set(&mut self, s: &str) {
        self.clear();
        self.current_input = s.to_string();
        self.curser_pos = self.len();
    }

    pub fn get(&self) -> InputResult {
        InputResult {
            canceled: self.canceled,
            finished: self.finished,
            input: self.current_input.clone(),
            curser_pos: self.curser_pos,
            changed: false,
        }
    }

    pub fn clear(&mut self) {
        self.canceled = false;
        self.finished = false;
        self.current_input.clear();
        self.curser_pos = 0;
    }

    fn len(&self) -> usize {
        self.current_input.chars().count()
    }

    fn backspace(&mut self) {
        if self.curser_pos > 0 {
            self.curser_pos -= 1;
            let idx = self.byte_pos();
            self.current_input.remove(idx);
        }
    }

    fn delete(&mut self) {
        if self.curser_pos < self.len() {
            let idx = self.byte_pos();
            self.current_input.remove(idx);
        }
    }

    fn byte_pos(&self) -> usize {
        self.current_input
            .char_indices()
            .nth(self.curser_pos)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.current_input.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyEvent;

    fn press(input: &mut Inputter, code: KeyCode) -> InputResult {
        input.read(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn typing_and_editing() {
        let mut input = Inputter::default();
        for c in "tehrn".chars() {
            press(&mut input, KeyCode::Char(c));
        }
        press(&mut input, KeyCode::Left);
        let r = press(&mut input, KeyCode::Char('a'));
        assert_eq!(r.input, "tehran");
        assert!(r.changed);
        let r = press(&mut input, KeyCode::Left);
        assert!(!r.changed);
        press(&mut input, KeyCode::Backspace);
        assert_eq!(input.get().input, "tehan");
        let r = press(&mut input, KeyCode::Enter);
        assert!(r.finished && !r.canceled);
    }

    #[test]
    fn multibyte_chars_are_handled() {
        let mut input = Inputter::default();
        input.set("تهران");
        assert_eq!(input.get().curser_pos, 5);
        press(&mut input, KeyCode::Backspace);
        assert_eq!(input.get().input, "تهرا");
    }

    #[test]
    fn escape_clears_and_cancels() {
        let mut input = Inputter::default();
        input.set("ali");
        let r = press(&mut input, KeyCode::Esc);
        assert!(r.canceled && r.finished && r.changed);
        assert_eq!(r.input, "");
    }
}
