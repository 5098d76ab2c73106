//! Key bindings.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Up,
    Down,
    Left,
    Right,
    Enter,
    Back,
    Toggle,
    Save,
    Quit,
    /// Remove the selected list item.
    Remove,
    MoveUp,
    MoveDown,
    /// Next option of a list item.
    Cycle,
    /// Type a value instead of picking it.
    Edit,
    NewFolder,
    Preset,
    Backspace,
    Char(char),
}

fn is_ctrl(key: &KeyEvent, c: char) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char(c)
}

/// Bindings while moving around the page.
pub fn nav_intent(key: KeyEvent) -> Option<Intent> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if is_ctrl(&key, 'c') {
        return Some(Intent::Quit);
    }
    if is_ctrl(&key, 's') {
        return Some(Intent::Save);
    }
    let intent = match key.code {
        KeyCode::Up | KeyCode::Char('k') => Intent::Up,
        KeyCode::Down | KeyCode::Char('j') | KeyCode::Tab => Intent::Down,
        KeyCode::BackTab => Intent::Up,
        KeyCode::Left | KeyCode::Char('h') => Intent::Left,
        KeyCode::Right | KeyCode::Char('l') => Intent::Right,
        KeyCode::Enter => Intent::Enter,
        KeyCode::Esc => Intent::Back,
        KeyCode::Char(' ') => Intent::Toggle,
        KeyCode::Char('s') => Intent::Save,
        KeyCode::Char('q') => Intent::Quit,
        KeyCode::Char('x') | KeyCode::Delete => Intent::Remove,
        KeyCode::Char('[') => Intent::MoveUp,
        KeyCode::Char(']') => Intent::MoveDown,
        KeyCode::Char('o') => Intent::Cycle,
        KeyCode::Char('e') => Intent::Edit,
        KeyCode::Char('n') => Intent::NewFolder,
        KeyCode::Char('p') => Intent::Preset,
        _ => return None,
    };
    Some(intent)
}

/// Bindings while a text prompt has focus.
pub fn input_intent(key: KeyEvent) -> Option<Intent> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if is_ctrl(&key, 'c') {
        return Some(Intent::Quit);
    }
    match key.code {
        KeyCode::Enter => Some(Intent::Enter),
        KeyCode::Esc => Some(Intent::Back),
        KeyCode::Backspace => Some(Intent::Backspace),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Intent::Char(c))
        }
        _ => None,
    }
}

/// Help line for the footer.
pub fn hints(editing: bool, in_modal: bool) -> &'static str {
    match (editing, in_modal) {
        (false, _) => "↑↓ move  enter open  q quit",
        (true, false) => "↑↓ move  ←→ item  enter edit  e type  o cycle  x remove  s save  esc back",
        (true, true) => "↑↓ move  ←→ item  enter edit/press  p preset  esc close",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_nav_bindings() {
        assert_eq!(nav_intent(key(KeyCode::Char('j'))), Some(Intent::Down));
        assert_eq!(nav_intent(key(KeyCode::Esc)), Some(Intent::Back));
        assert_eq!(nav_intent(key(KeyCode::Char('z'))), None);
        let save = KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL);
        assert_eq!(nav_intent(save), Some(Intent::Save));
    }

    #[test]
    fn test_release_is_ignored() {
        let release = KeyEvent {
            code: KeyCode::Enter,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        assert_eq!(nav_intent(release), None);
        assert_eq!(input_intent(release), None);
    }

    #[test]
    fn test_prompt_takes_letters() {
        assert_eq!(input_intent(key(KeyCode::Char('q'))), Some(Intent::Char('q')));
        assert_eq!(input_intent(key(KeyCode::Char(' '))), Some(Intent::Char(' ')));
        let quit = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(input_intent(quit), Some(Intent::Quit));
    }
}
