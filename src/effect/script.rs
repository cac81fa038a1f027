//! Event script reader
//!
//! Scripts are whitespace separated token streams:
//!
//! ```text
//! <EVENTS>
//!   <EVENT> X_ASCEND Y_DESCEND Z_ASCEND 40 500
//!   <EVENT> X_DESCEND Y_ASCEND Z_DESCEND 40 500
//! <END_EVENTS>
//! <END>
//! ```
//!
//! Each event lists the x, y and z directions followed by the step and hold
//! intervals in milliseconds. Tags and direction names are case-insensitive.

use core::str::SplitWhitespace;

use embassy_time::Duration;

use super::WanderEvent;
use crate::error::ScriptError;
use crate::transform::Direction;

const TAG_EVENTS: &str = "<EVENTS>";
const TAG_EVENT: &str = "<EVENT>";
const TAG_END_EVENTS: &str = "<END_EVENTS>";
const TAG_END: &str = "<END>";

/// Parse a complete script, up to and including `<END>`
pub fn parse_events(script: &str) -> Result<Vec<WanderEvent>, ScriptError> {
    let mut events = Vec::new();
    read_events(script, &mut events)?;
    Ok(events)
}

/// Append every event of `script` to `events`
///
/// Events read before an error stay in `events`.
pub fn read_events(script: &str, events: &mut Vec<WanderEvent>) -> Result<(), ScriptError> {
    let mut tokens = script.split_whitespace();

    loop {
        let tag = next_token(&mut tokens)?;
        if tag.eq_ignore_ascii_case(TAG_END) {
            return Ok(());
        }
        if !tag.eq_ignore_ascii_case(TAG_EVENTS) {
            return Err(ScriptError::UnknownTag(tag.to_owned()));
        }

        loop {
            let tag = next_token(&mut tokens)?;
            if tag.eq_ignore_ascii_case(TAG_EVENT) {
                events.push(parse_event(&mut tokens)?);
            } else if tag.eq_ignore_ascii_case(TAG_END_EVENTS) {
                break;
            } else if tag.eq_ignore_ascii_case(TAG_END) {
                return Ok(());
            } else {
                return Err(ScriptError::UnknownTag(tag.to_owned()));
            }
        }
    }
}

fn parse_event(tokens: &mut SplitWhitespace<'_>) -> Result<WanderEvent, ScriptError> {
    Ok(WanderEvent {
        x: parse_direction(next_token(tokens)?)?,
        y: parse_direction(next_token(tokens)?)?,
        z: parse_direction(next_token(tokens)?)?,
        step: parse_interval(next_token(tokens)?)?,
        hold: parse_interval(next_token(tokens)?)?,
    })
}

fn next_token<'a>(tokens: &mut SplitWhitespace<'a>) -> Result<&'a str, ScriptError> {
    tokens.next().ok_or(ScriptError::UnexpectedEof)
}

fn parse_direction(token: &str) -> Result<Direction, ScriptError> {
    Direction::parse_from_str(token).ok_or_else(|| ScriptError::UnknownDirection(token.to_owned()))
}

fn parse_interval(token: &str) -> Result<Duration, ScriptError> {
    token
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| ScriptError::InvalidInterval(token.to_owned()))
}
