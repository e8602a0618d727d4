use regex::Regex;

use crate::error::{Error, Result};

const RANGE: &str = r"^\[(-?\d+)(?:,(-?\d+))?\.\.(-?\d+)\]$";

/// An inclusive arithmetic progression written as `[a..c]` or `[a,b..c]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub first: i64,
    pub step: i64,
    pub last: i64,
}

impl Range {
    /// Parse a whole token. `Ok(None)` means the token is not a range.
    pub fn parse(token: &str) -> Result<Option<Self>> {
        let rgx = Regex::new(RANGE).unwrap();
        let caps = match rgx.captures(token) {
            Some(caps) => caps,
            None => return Ok(None),
        };
        let number = |s: &str| {
            s.parse::<i64>().map_err(|e| Error::Range {
                token: token.into(),
                msg: e.to_string(),
            })
        };
        let first = number(&caps[1])?;
        let last = number(&caps[3])?;
        let step = match caps.get(2) {
            Some(second) => number(second.as_str())?
                .checked_sub(first)
                .ok_or_else(|| Error::Range {
                    token: token.into(),
                    msg: "step overflows".into(),
                })?,
            None if first > last => {
                return Err(Error::Range {
                    token: token.into(),
                    msg: "start is after the end, give the second element to count down".into(),
                })
            }
            None => 1,
        };
        if step == 0 {
            return Err(Error::Range {
                token: token.into(),
                msg: "zero step".into(),
            });
        }

        let range = Self { first, step, last };
        if !range.contains(first) {
            return Err(Error::Range {
                token: token.into(),
                msg: "empty range".into(),
            });
        }
        Ok(Some(range))
    }

    fn contains(self, value: i64) -> bool {
        if self.step > 0 {
            value <= self.last
        } else {
            value >= self.last
        }
    }

    /// The value following `value`, if it is still inside the range.
    pub fn after(self, value: i64) -> Option<i64> {
        value
            .checked_add(self.step)
            .filter(|next| self.contains(*next))
    }
}

#[derive(Debug, Clone)]
enum Word {
    Fixed(String),
    Counter { range: Range, current: i64 },
}

/// Commands produced by a generator command with range tokens, computed
/// one at a time. The first range varies fastest.
#[derive(Debug, Clone)]
pub struct Expansion {
    words: Vec<Word>,
    exhausted: bool,
}

impl Expansion {
    pub fn new(command: &str) -> Result<Self> {
        let tokens = shlex::split(command).ok_or_else(|| Error::Command(command.into()))?;
        if tokens.is_empty() {
            return Err(Error::Command(command.into()));
        }

        let mut words = Vec::with_capacity(tokens.len());
        for token in &tokens {
            match Range::parse(token)? {
                Some(range) => words.push(Word::Counter {
                    range,
                    current: range.first,
                }),
                None => words.push(Word::Fixed(quote(token)?)),
            }
        }
        Ok(Self {
            words,
            exhausted: false,
        })
    }
}

impl Iterator for Expansion {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.exhausted {
            return None;
        }
        let mut command = Vec::with_capacity(self.words.len());
        for word in &self.words {
            command.push(match word {
                Word::Fixed(text) => text.clone(),
                Word::Counter { current, .. } => current.to_string(),
            });
        }

        self.exhausted = true;
        for word in self.words.iter_mut() {
            if let Word::Counter { range, current } = word {
                match range.after(*current) {
                    Some(next) => {
                        *current = next;
                        self.exhausted = false;
                        break;
                    }
                    None => *current = range.first,
                }
            }
        }
        Some(command.join(" "))
    }
}

/// Expand every range token of a generator command into the cartesian
/// product of commands. Every produced word is quoted so that the results
/// can be split again.
pub fn expand_generator_command(command: &str) -> Result<Vec<String>> {
    Ok(Expansion::new(command)?.collect())
}

fn quote(word: &str) -> Result<String> {
    shlex::try_quote(word)
        .map(|q| q.into_owned())
        .map_err(|_| Error::Command(word.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_command_is_unchanged() -> Result<()> {
        assert_eq!(expand_generator_command("gen 5 abc")?, vec!["gen 5 abc"]);
        Ok(())
    }

    #[test]
    fn single_range() -> Result<()> {
        assert_eq!(
            expand_generator_command("gen [1..3]")?,
            vec!["gen 1", "gen 2", "gen 3"]
        );
        Ok(())
    }

    #[test]
    fn stepped_and_descending_ranges() -> Result<()> {
        assert_eq!(
            expand_generator_command("gen [1,3..8]")?,
            vec!["gen 1", "gen 3", "gen 5", "gen 7"]
        );
        assert_eq!(
            expand_generator_command("gen [5,3..-1]")?,
            vec!["gen 5", "gen 3", "gen 1", "gen -1"]
        );
        assert_eq!(expand_generator_command("gen [4..4]")?, vec!["gen 4"]);
        Ok(())
    }

    #[test]
    fn first_range_varies_fastest() -> Result<()> {
        assert_eq!(
            expand_generator_command("gen [1..2] x [7..8]")?,
            vec!["gen 1 x 7", "gen 2 x 7", "gen 1 x 8", "gen 2 x 8"]
        );
        Ok(())
    }

    #[test]
    fn quoting_survives() -> Result<()> {
        let expanded = expand_generator_command("gen 'two words' [1..2]")?;
        assert_eq!(expanded.len(), 2);
        assert_eq!(
            shlex::split(&expanded[1]).unwrap(),
            vec!["gen", "two words", "2"]
        );
        Ok(())
    }

    #[test]
    fn malformed_ranges() {
        assert!(matches!(
            expand_generator_command("gen [1,1..5]"),
            Err(Error::Range { .. })
        ));
        assert!(matches!(
            expand_generator_command("gen [5..1]"),
            Err(Error::Range { .. })
        ));
        assert!(matches!(
            expand_generator_command("gen [1,2..0]"),
            Err(Error::Range { .. })
        ));
        assert!(matches!(
            expand_generator_command("gen [-9223372036854775808,9223372036854775807..0]"),
            Err(Error::Range { .. })
        ));
        assert!(matches!(
            expand_generator_command("gen 'unterminated"),
            Err(Error::Command(_))
        ));
    }

    #[test]
    fn near_miss_tokens_are_literal() -> Result<()> {
        let expanded = expand_generator_command("gen [1..x] [..3]")?;
        assert_eq!(expanded.len(), 1);
        assert_eq!(
            shlex::split(&expanded[0]).unwrap(),
            vec!["gen", "[1..x]", "[..3]"]
        );
        Ok(())
    }

    #[test]
    fn huge_ranges_are_produced_on_demand() -> Result<()> {
        let mut commands = Expansion::new("gen [1..1000000000000] [1..2]")?;
        assert_eq!(commands.next().as_deref(), Some("gen 1 1"));
        assert_eq!(commands.next().as_deref(), Some("gen 2 1"));
        Ok(())
    }

    #[test]
    fn ranges_stop_at_the_integer_bounds() -> Result<()> {
        assert_eq!(
            expand_generator_command("gen [9223372036854775806..9223372036854775807]")?,
            vec!["gen 9223372036854775806", "gen 9223372036854775807"]
        );
        Ok(())
    }
}
