//! Terminal line editor
//!
//! Turns raw keystrokes from the SSH channel into edited input lines and
//! renders everything the operator sees: the prompt, echoed input and
//! output printed above the prompt. It never touches I/O itself; every
//! method appends the bytes to send to `out`.

use std::collections::VecDeque;

use unicode_width::UnicodeWidthChar;
use vte::{Params, Parser, Perform};

const CRLF: &[u8] = b"\r\n";
const CLEAR_LINE: &[u8] = b"\r\x1b[K";
const BELL: u8 = 0x07;
const BACKSPACE: u8 = 0x08;
const DEL: u8 = 0x7f;

/// Result of reading one line of operator input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A submitted line, without its terminator
    Line(String),
    /// The operator pressed Ctrl-D on an empty line or Ctrl-C, or the
    /// channel went away
    EndOfInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Key {
    Char(char),
    Enter,
    Backspace,
    Delete,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    Interrupt,
    EndOfFile,
    KillLine,
}

/// Collects decoded keys from the vte parser
#[derive(Default)]
struct KeyDecoder {
    keys: VecDeque<Key>,
    /// Last key was a CR, so a following LF is part of the same Enter
    after_cr: bool,
    /// Inside `ESC O`, where the next character names a cursor key
    ss3: bool,
}

impl KeyDecoder {
    fn push(&mut self, key: Key) {
        self.after_cr = false;
        self.keys.push_back(key);
    }
}

impl Perform for KeyDecoder {
    fn print(&mut self, c: char) {
        if std::mem::take(&mut self.ss3) {
            if let Some(key) = cursor_key(c) {
                self.push(key);
            }
            return;
        }
        self.push(Key::Char(c));
    }

    fn execute(&mut self, byte: u8) {
        let key = match byte {
            b'\r' => {
                self.push(Key::Enter);
                self.after_cr = true;
                return;
            }
            b'\n' if self.after_cr => {
                self.after_cr = false;
                return;
            }
            b'\n' => Key::Enter,
            BACKSPACE => Key::Backspace,
            0x01 => Key::Home,
            0x02 => Key::Left,
            0x03 => Key::Interrupt,
            0x04 => Key::EndOfFile,
            0x05 => Key::End,
            0x06 => Key::Right,
            0x0e => Key::Down,
            0x10 => Key::Up,
            0x15 => Key::KillLine,
            _ => return,
        };
        self.push(key);
    }

    fn csi_dispatch(&mut self, params: &Params, intermediates: &[u8], _ignore: bool, action: char) {
        if !intermediates.is_empty() {
            return;
        }
        let param0 = params
            .iter()
            .next()
            .and_then(|p| p.first().copied())
            .unwrap_or(0);

        let key = match (action, param0) {
            ('~', 1 | 7) => Some(Key::Home),
            ('~', 4 | 8) => Some(Key::End),
            ('~', 3) => Some(Key::Delete),
            ('~', _) => None,
            (c, _) => cursor_key(c),
        };
        if let Some(key) = key {
            self.push(key);
        }
    }

    fn esc_dispatch(&mut self, intermediates: &[u8], _ignore: bool, byte: u8) {
        self.ss3 = intermediates.is_empty() && byte == b'O';
    }
}

/// Final character of a cursor key sequence (`CSI x` or `ESC O x`)
fn cursor_key(c: char) -> Option<Key> {
    match c {
        'A' => Some(Key::Up),
        'B' => Some(Key::Down),
        'C' => Some(Key::Right),
        'D' => Some(Key::Left),
        'H' => Some(Key::Home),
        'F' => Some(Key::End),
        _ => None,
    }
}

/// Line editing state for one terminal
pub struct LineEditor {
    prompt: String,
    line: Vec<char>,
    cursor: usize,
    /// Whether the prompt and partial input are currently on screen
    prompt_visible: bool,
    /// Submitted lines, most recent first
    history: VecDeque<String>,
    history_size: usize,
    /// Index into `history` while browsing
    history_pos: Option<usize>,
    /// Input that was being typed before browsing started
    draft: Vec<char>,
    parser: Parser,
    /// Keys decoded but not yet applied
    decoder: KeyDecoder,
}

impl LineEditor {
    /// Create an editor with the given prompt and history capacity
    pub fn new(prompt: impl Into<String>, history_size: usize) -> Self {
        Self {
            prompt: prompt.into(),
            line: Vec::new(),
            cursor: 0,
            prompt_visible: false,
            history: VecDeque::new(),
            history_size,
            history_pos: None,
            draft: Vec::new(),
            parser: Parser::new(),
            decoder: KeyDecoder::default(),
        }
    }

    /// Current prompt
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Input typed so far
    pub fn line(&self) -> String {
        self.line.iter().collect()
    }

    /// Remembered lines, most recent first
    pub fn history(&self) -> impl Iterator<Item = &str> {
        self.history.iter().map(String::as_str)
    }

    /// Draw the prompt unless it is already on screen
    pub fn show_prompt(&mut self, out: &mut Vec<u8>) {
        if !self.prompt_visible {
            self.prompt_visible = true;
            self.draw(out);
        }
    }

    /// Process input bytes until a line is complete or the input runs out
    ///
    /// Keys following a completed line are kept for the next call.
    pub fn feed(&mut self, input: &[u8], out: &mut Vec<u8>) -> Option<ReadOutcome> {
        for &byte in input {
            // vte drops DEL, which most terminals send for Backspace
            let byte = if byte == DEL { BACKSPACE } else { byte };
            self.parser.advance(&mut self.decoder, byte);
        }

        while let Some(key) = self.decoder.keys.pop_front() {
            if let Some(outcome) = self.handle_key(key, out) {
                return Some(outcome);
            }
        }

        None
    }

    /// Print lines above the prompt, then put the prompt back
    pub fn output_lines<S: AsRef<str>>(&mut self, lines: &[S], out: &mut Vec<u8>) {
        if self.prompt_visible {
            out.extend_from_slice(CLEAR_LINE);
        }
        for line in lines {
            for (i, part) in line.as_ref().split('\n').enumerate() {
                if i > 0 {
                    out.extend_from_slice(CRLF);
                }
                out.extend_from_slice(part.trim_end_matches('\r').as_bytes());
            }
            out.extend_from_slice(CRLF);
        }
        if self.prompt_visible {
            self.draw(out);
        }
    }

    /// Replace the prompt, redrawing it if shown
    pub fn set_prompt(&mut self, prompt: &str, out: &mut Vec<u8>) {
        self.prompt = prompt.to_string();
        if self.prompt_visible {
            self.draw(out);
        }
    }

    /// Redraw the prompt line if shown
    pub fn refresh(&mut self, out: &mut Vec<u8>) {
        if self.prompt_visible {
            self.draw(out);
        }
    }

    /// Ring the bell
    pub fn bell(&self, out: &mut Vec<u8>) {
        out.push(BELL);
    }

    fn handle_key(&mut self, key: Key, out: &mut Vec<u8>) -> Option<ReadOutcome> {
        match key {
            Key::Char(c) => {
                self.line.insert(self.cursor, c);
                self.cursor += 1;
                if self.cursor == self.line.len() {
                    let mut buf = [0u8; 4];
                    out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                } else {
                    self.draw(out);
                }
            }
            Key::Enter => {
                let line = self.line();
                out.extend_from_slice(CRLF);
                self.prompt_visible = false;
                self.remember(&line);
                self.reset_line();
                return Some(ReadOutcome::Line(line));
            }
            Key::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    self.line.remove(self.cursor);
                    self.draw(out);
                }
            }
            Key::Delete => {
                if self.cursor < self.line.len() {
                    self.line.remove(self.cursor);
                    self.draw(out);
                }
            }
            Key::Left => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    self.draw(out);
                }
            }
            Key::Right => {
                if self.cursor < self.line.len() {
                    self.cursor += 1;
                    self.draw(out);
                }
            }
            Key::Home => {
                self.cursor = 0;
                self.draw(out);
            }
            Key::End => {
                self.cursor = self.line.len();
                self.draw(out);
            }
            Key::Up => self.history_back(out),
            Key::Down => self.history_forward(out),
            Key::Interrupt => return Some(self.end_of_input(out)),
            Key::EndOfFile => {
                if self.line.is_empty() {
                    return Some(self.end_of_input(out));
                }
                if self.cursor < self.line.len() {
                    self.line.remove(self.cursor);
                    self.draw(out);
                }
            }
            Key::KillLine => {
                self.line.clear();
                self.cursor = 0;
                self.draw(out);
            }
        }
        None
    }

    fn end_of_input(&mut self, out: &mut Vec<u8>) -> ReadOutcome {
        out.extend_from_slice(CRLF);
        self.prompt_visible = false;
        self.reset_line();
        ReadOutcome::EndOfInput
    }

    fn reset_line(&mut self) {
        self.line.clear();
        self.cursor = 0;
        self.history_pos = None;
        self.draft.clear();
    }

    fn remember(&mut self, line: &str) {
        if line.trim().is_empty() || self.history.front().map(String::as_str) == Some(line) {
            return;
        }
        self.history.push_front(line.to_string());
        self.history.truncate(self.history_size);
    }

    fn history_back(&mut self, out: &mut Vec<u8>) {
        let next = self.history_pos.map_or(0, |pos| pos + 1);
        let Some(entry) = self.history.get(next) else {
            self.bell(out);
            return;
        };
        if self.history_pos.is_none() {
            self.draft = std::mem::take(&mut self.line);
        }
        self.line = entry.chars().collect();
        self.history_pos = Some(next);
        self.cursor = self.line.len();
        self.draw(out);
    }

    fn history_forward(&mut self, out: &mut Vec<u8>) {
        match self.history_pos {
            None => return,
            Some(0) => {
                self.history_pos = None;
                self.line = std::mem::take(&mut self.draft);
            }
            Some(pos) => {
                self.history_pos = Some(pos - 1);
                self.line = self.history[pos - 1].chars().collect();
            }
        }
        self.cursor = self.line.len();
        self.draw(out);
    }

    fn draw(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(CLEAR_LINE);
        out.extend_from_slice(self.prompt.as_bytes());
        let line: String = self.line.iter().collect();
        out.extend_from_slice(line.as_bytes());

        let tail: usize = self.line[self.cursor..]
            .iter()
            .map(|c| c.width().unwrap_or(0))
            .sum();
        if tail > 0 {
            out.extend_from_slice(format!("\x1b[{}D", tail).as_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor() -> LineEditor {
        let mut editor = LineEditor::new("> ", 3);
        let mut out = Vec::new();
        editor.show_prompt(&mut out);
        editor
    }

    fn feed(editor: &mut LineEditor, input: &[u8]) -> Option<ReadOutcome> {
        let mut out = Vec::new();
        editor.feed(input, &mut out)
    }

    #[test]
    fn test_submit_line() {
        let mut editor = editor();
        let mut out = Vec::new();

        assert_eq!(editor.feed(b"list", &mut out), None);
        assert_eq!(out, b"list");

        let outcome = editor.feed(b"\r", &mut out);
        assert_eq!(outcome, Some(ReadOutcome::Line("list".to_string())));
        assert!(out.ends_with(b"\r\n"));
        assert_eq!(editor.line(), "");
    }

    #[test]
    fn test_crlf_submits_once() {
        let mut editor = editor();
        assert_eq!(
            feed(&mut editor, b"say hi\r\n"),
            Some(ReadOutcome::Line("say hi".to_string()))
        );
        // The trailing LF belongs to the CR and must not submit an empty line
        assert_eq!(feed(&mut editor, b""), None);
    }

    #[test]
    fn test_pasted_lines_are_returned_one_at_a_time() {
        let mut editor = editor();
        assert_eq!(
            feed(&mut editor, b"first\rsecond\r"),
            Some(ReadOutcome::Line("first".to_string()))
        );
        assert_eq!(
            feed(&mut editor, b""),
            Some(ReadOutcome::Line("second".to_string()))
        );
        assert_eq!(feed(&mut editor, b""), None);
    }

    #[test]
    fn test_backspace_and_cursor_movement() {
        let mut editor = editor();
        // type "lsit", go left twice, delete the 's', retype it after 'i'
        feed(&mut editor, b"lsit");
        feed(&mut editor, b"\x1b[D\x1b[D\x7f");
        assert_eq!(editor.line(), "lit");
        feed(&mut editor, b"\x1b[Cs");
        assert_eq!(editor.line(), "list");
        feed(&mut editor, b"\x05\x01x");
        assert_eq!(editor.line(), "xlist");
    }

    #[test]
    fn test_escape_sequence_split_across_reads() {
        let mut editor = editor();
        feed(&mut editor, b"ab\x1b");
        feed(&mut editor, b"[");
        feed(&mut editor, b"D");
        feed(&mut editor, b"X");
        assert_eq!(editor.line(), "aXb");
    }

    #[test]
    fn test_application_cursor_keys() {
        let mut editor = editor();
        feed(&mut editor, b"one\r");
        feed(&mut editor, b"ab\x1bOD\x1bODX");
        assert_eq!(editor.line(), "Xab");

        feed(&mut editor, b"\x1bOA");
        assert_eq!(editor.line(), "one");
    }

    #[test]
    fn test_home_end_and_delete_keys() {
        let mut editor = editor();
        feed(&mut editor, b"bc\x1b[1~a\x1b[3~");
        assert_eq!(editor.line(), "ac");
        feed(&mut editor, b"\x1b[4~d\x1b[Hx");
        assert_eq!(editor.line(), "xacd");
    }

    #[test]
    fn test_unknown_sequences_are_dropped() {
        let mut editor = editor();
        feed(&mut editor, b"a\x1b[2J\x1b]0;title\x07b");
        assert_eq!(editor.line(), "ab");
    }

    #[test]
    fn test_multibyte_input_split_across_reads() {
        let mut editor = editor();
        let bytes = "é".as_bytes();
        feed(&mut editor, &bytes[..1]);
        assert_eq!(editor.line(), "");
        feed(&mut editor, &bytes[1..]);
        assert_eq!(editor.line(), "é");
    }

    #[test]
    fn test_ctrl_d_on_empty_line_ends_input() {
        let mut editor = editor();
        assert_eq!(feed(&mut editor, b"\x04"), Some(ReadOutcome::EndOfInput));
    }

    #[test]
    fn test_ctrl_d_with_input_deletes_under_cursor() {
        let mut editor = editor();
        feed(&mut editor, b"abc\x01\x04");
        assert_eq!(editor.line(), "bc");
    }

    #[test]
    fn test_ctrl_c_discards_input_and_ends() {
        let mut editor = editor();
        assert_eq!(feed(&mut editor, b"half typed\x03"), Some(ReadOutcome::EndOfInput));
        assert_eq!(editor.line(), "");
    }

    #[test]
    fn test_history_browsing() {
        let mut editor = editor();
        feed(&mut editor, b"one\r");
        feed(&mut editor, b"two\r");
        feed(&mut editor, b"draft");

        feed(&mut editor, b"\x1b[A");
        assert_eq!(editor.line(), "two");
        feed(&mut editor, b"\x1b[A");
        assert_eq!(editor.line(), "one");
        feed(&mut editor, b"\x1b[B\x1b[B");
        assert_eq!(editor.line(), "draft");
    }

    #[test]
    fn test_history_is_bounded_and_deduplicated() {
        let mut editor = editor();
        for line in ["a\r", "b\r", "b\r", "c\r", "d\r", "\r"] {
            feed(&mut editor, line.as_bytes());
        }
        let history: Vec<_> = editor.history().collect();
        assert_eq!(history, vec!["d", "c", "b"]);
    }

    #[test]
    fn test_output_redraws_partial_input() {
        let mut editor = editor();
        feed(&mut editor, b"sa");

        let mut out = Vec::new();
        editor.output_lines(&["lobby | joined"], &mut out);
        assert_eq!(out, b"\r\x1b[Klobby | joined\r\n\r\x1b[K> sa");
    }

    #[test]
    fn test_output_while_prompt_hidden() {
        let mut editor = editor();
        feed(&mut editor, b"list\r");

        let mut out = Vec::new();
        editor.output_lines(&["Configured connections:"], &mut out);
        assert_eq!(out, b"Configured connections:\r\n");
    }

    #[test]
    fn test_set_prompt_redraws_when_visible() {
        let mut editor = editor();
        let mut out = Vec::new();
        editor.set_prompt("lobby> ", &mut out);
        assert_eq!(out, b"\r\x1b[Klobby> ");
        assert_eq!(editor.prompt(), "lobby> ");
    }
}
