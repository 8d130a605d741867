// Input Module - Keyboard polling for steering and the menu
use anyhow::Result;
use crossterm::event::{poll, read, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use log::debug;
use std::time::Duration;

use crate::game::{InputEvent, InputSource, MenuChoice, MenuController};
use crate::types::Heading;

fn is_ctrl_c(key: &KeyEvent) -> bool {
    key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)
}

/// Steering keys: arrows and WASD. Ctrl+C interrupts.
pub fn key_to_event(key: &KeyEvent) -> Option<InputEvent> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    if is_ctrl_c(key) {
        return Some(InputEvent::Interrupt);
    }
    let heading = match key.code {
        KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('W') => Heading::Up,
        KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') => Heading::Down,
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => Heading::Left,
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => Heading::Right,
        _ => return None,
    };
    Some(InputEvent::Steer(heading))
}

pub fn key_to_menu_choice(key: &KeyEvent) -> Option<MenuChoice> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    if is_ctrl_c(key) {
        return Some(MenuChoice::Quit);
    }
    match key.code {
        KeyCode::Char('p') | KeyCode::Char('P') => Some(MenuChoice::Play),
        KeyCode::Char('q') | KeyCode::Char('Q') => Some(MenuChoice::Quit),
        _ => None,
    }
}

// Non-blocking: drains every queued key and reports the most recent one
#[derive(Debug, Default)]
pub struct KeyboardInput;

impl InputSource for KeyboardInput {
    fn poll(&mut self) -> Result<Option<InputEvent>> {
        let mut latest = None;
        while poll(Duration::from_millis(0))? {
            if let Event::Key(key) = read()? {
                match key_to_event(&key) {
                    Some(InputEvent::Interrupt) => return Ok(Some(InputEvent::Interrupt)),
                    Some(event) => latest = Some(event),
                    None => {}
                }
            }
        }
        Ok(latest)
    }
}

// Blocks on the keyboard until P or Q
#[derive(Debug, Default)]
pub struct TerminalMenu;

impl MenuController for TerminalMenu {
    fn choose(&mut self) -> Result<MenuChoice> {
        loop {
            if let Event::Key(key) = read()? {
                if let Some(choice) = key_to_menu_choice(&key) {
                    debug!("Menu choice: {:?}", choice);
                    return Ok(choice);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_arrows_and_wasd_steer() {
        assert_eq!(key_to_event(&press(KeyCode::Up)), Some(InputEvent::Steer(Heading::Up)));
        assert_eq!(key_to_event(&press(KeyCode::Char('a'))), Some(InputEvent::Steer(Heading::Left)));
        assert_eq!(key_to_event(&press(KeyCode::Char('S'))), Some(InputEvent::Steer(Heading::Down)));
        assert_eq!(key_to_event(&press(KeyCode::Right)), Some(InputEvent::Steer(Heading::Right)));
        assert_eq!(key_to_event(&press(KeyCode::Char('x'))), None);
    }

    #[test]
    fn test_ctrl_c_interrupts_and_quits() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(key_to_event(&ctrl_c), Some(InputEvent::Interrupt));
        assert_eq!(key_to_menu_choice(&ctrl_c), Some(MenuChoice::Quit));
        assert_eq!(key_to_event(&press(KeyCode::Char('c'))), None);
    }

    #[test]
    fn test_menu_keys() {
        assert_eq!(key_to_menu_choice(&press(KeyCode::Char('p'))), Some(MenuChoice::Play));
        assert_eq!(key_to_menu_choice(&press(KeyCode::Char('P'))), Some(MenuChoice::Play));
        assert_eq!(key_to_menu_choice(&press(KeyCode::Char('q'))), Some(MenuChoice::Quit));
        assert_eq!(key_to_menu_choice(&press(KeyCode::Enter)), None);
    }

    #[test]
    fn test_key_release_is_ignored() {
        let mut release = press(KeyCode::Up);
        release.kind = KeyEventKind::Release;
        assert_eq!(key_to_event(&release), None);
        assert_eq!(key_to_menu_choice(&release), None);
    }
}
