use super::{Param, ParamArg, ParsedConfig, PowerMode, Setting};
use crate::error::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

static PRESET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<\s+PM_CONFIG\s+DEFAULT=(\d)\s+>").expect("valid regex"));
static POWER_MODEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<\s+POWER_MODEL\s+ID=(\d+)\s+NAME=(\w+)\s+>").expect("valid regex")
});
static PARAM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<\s+PARAM\s+TYPE=(\w+)\s+NAME=(\w+)\s+>").expect("valid regex")
});

/// What a single cleaned line means to the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line<'a> {
    PresetDirective { id: &'a str },
    PowerModelHeader { id: &'a str, name: &'a str },
    ParamHeader { kind: &'a str, name: &'a str },
    /// Body line of whichever block is open.
    Data(&'a str),
    /// Any other `<`-prefixed directive. Closes the open block.
    Ignored,
}

pub fn classify(line: &str) -> Line<'_> {
    if !line.starts_with('<') {
        return Line::Data(line);
    }
    if let Some(c) = PRESET_RE.captures(line) {
        let id = c.get(1).map_or("", |m| m.as_str());
        return Line::PresetDirective { id };
    }
    if let Some(c) = POWER_MODEL_RE.captures(line) {
        return Line::PowerModelHeader {
            id: c.get(1).map_or("", |m| m.as_str()),
            name: c.get(2).map_or("", |m| m.as_str()),
        };
    }
    if let Some(c) = PARAM_RE.captures(line) {
        return Line::ParamHeader {
            kind: c.get(1).map_or("", |m| m.as_str()),
            name: c.get(2).map_or("", |m| m.as_str()),
        };
    }
    Line::Ignored
}

enum Block {
    None,
    Mode(PowerMode),
    Param(Param),
}

fn close(block: Block, out: &mut ParsedConfig) {
    match block {
        Block::Mode(m) => out.power_modes.push(m),
        Block::Param(p) => out.params.push(p),
        Block::None => {}
    }
}

fn parse_setting(line_no: usize, line: &str) -> Result<Setting> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    match tokens.as_slice() {
        [name, attribute, value] => Ok(Setting {
            name: name.to_string(),
            attribute: attribute.to_string(),
            value: value.to_string(),
        }),
        _ => Err(Error::MalformedSetting {
            line_no,
            line: line.to_string(),
        }),
    }
}

fn parse_param_arg(line_no: usize, line: &str) -> Result<ParamArg> {
    match line.split_once(char::is_whitespace) {
        Some((name, path)) if !path.trim().is_empty() => Ok(ParamArg {
            name: name.to_string(),
            path: path.trim().to_string(),
        }),
        _ => Err(Error::MalformedParamArg {
            line_no,
            line: line.to_string(),
        }),
    }
}

/// Build the typed model from cleaned config lines in a single forward scan.
///
/// Each block header opens a block that collects the following data lines
/// until the next `<` line. Data lines outside a mode or param block are
/// skipped. Only the first preset directive counts. Line numbers in errors
/// are 1-based indices into `lines`.
pub fn parse<S: AsRef<str>>(lines: &[S]) -> Result<ParsedConfig> {
    let mut out = ParsedConfig::default();
    let mut block = Block::None;

    for (idx, line) in lines.iter().enumerate() {
        let line = line.as_ref();
        let line_no = idx + 1;

        match classify(line) {
            Line::Data(text) => match &mut block {
                Block::Mode(m) => m.settings.push(parse_setting(line_no, text)?),
                Block::Param(p) => p.args.push(parse_param_arg(line_no, text)?),
                Block::None => {
                    tracing::debug!(line_no, "skipping line outside any block: {text}");
                }
            },
            Line::PresetDirective { id } => {
                close(std::mem::replace(&mut block, Block::None), &mut out);
                if out.preset.is_none() {
                    out.preset = Some(id.to_string());
                }
            }
            Line::PowerModelHeader { id, name } => {
                let mode = PowerMode {
                    id: id.to_string(),
                    name: name.to_string(),
                    settings: Vec::new(),
                };
                close(std::mem::replace(&mut block, Block::Mode(mode)), &mut out);
            }
            Line::ParamHeader { kind, name } => {
                let param = Param {
                    kind: kind.to_string(),
                    name: name.to_string(),
                    args: Vec::new(),
                };
                close(std::mem::replace(&mut block, Block::Param(param)), &mut out);
            }
            Line::Ignored => {
                close(std::mem::replace(&mut block, Block::None), &mut out);
            }
        }
    }
    close(block, &mut out);

    tracing::debug!(
        preset = ?out.preset,
        modes = out.power_modes.len(),
        params = out.params.len(),
        "parsed nvpmodel config"
    );

    Ok(out)
}
