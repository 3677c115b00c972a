//! The line-oriented preset text format.
//!
//! ```text
//! [Preset]
//! name=Warm Pad
//! vco_count=1
//! vco0_waveform_type=1
//! vcf_cutoff_freq=1500
//! env_attack=1.2
//! mod_conn_count=1
//! conn0_source=0
//! conn0_destination=6
//! conn0_amount=0.3
//! conn0_active=1
//! conn0_name=LFO sweep
//! [EndPreset]
//! ```
//!
//! Blank lines and lines starting with `#` or `;` are skipped. Unknown keys
//! are ignored. Short aliases are accepted on input (`attack`, `decay`,
//! `sustain`, `release`, `vcoN_waveform` with a symbolic name, `vcf_cutoff`,
//! `vcf_res`); output always uses the canonical keys in a fixed order.
//! Parsing is all or nothing: the first malformed line fails the whole text.

use std::fmt::Write as _;

use vasynth_synth::Waveform;

use crate::error::ConfigError;
use crate::preset::{ConnectionPreset, EnvelopePreset, LfoPreset, Preset, VcoPreset};

/// Opening section marker.
pub const BEGIN: &str = "[Preset]";
/// Closing section marker.
pub const END: &str = "[EndPreset]";

/// Highest number of oscillators a preset may declare.
pub const MAX_VCOS: usize = 16;
/// Highest number of modulation links a preset may declare.
pub const MAX_CONNECTIONS: usize = 256;

type ParseResult<T> = Result<T, ConfigError>;

struct Section {
    preset: Preset,
    vco_count: Option<usize>,
    conn_count: Option<usize>,
}

impl Section {
    fn new() -> Self {
        Self {
            preset: Preset {
                vcos: Vec::new(),
                connections: Vec::new(),
                ..Preset::default()
            },
            vco_count: None,
            conn_count: None,
        }
    }

    fn vco(&mut self, index: usize, line: usize) -> ParseResult<&mut VcoPreset> {
        if index >= MAX_VCOS {
            return Err(ConfigError::parse(
                line,
                format!("oscillator index {index} exceeds {}", MAX_VCOS - 1),
            ));
        }
        if self.preset.vcos.len() <= index {
            self.preset.vcos.resize_with(index + 1, VcoPreset::default);
        }
        Ok(&mut self.preset.vcos[index])
    }

    fn connection(&mut self, index: usize, line: usize) -> ParseResult<&mut ConnectionPreset> {
        if index >= MAX_CONNECTIONS {
            return Err(ConfigError::parse(
                line,
                format!("link index {index} exceeds {}", MAX_CONNECTIONS - 1),
            ));
        }
        let links = &mut self.preset.connections;
        if links.len() <= index {
            links.resize_with(index + 1, ConnectionPreset::default);
        }
        Ok(&mut links[index])
    }

    fn finish(mut self, line: usize) -> ParseResult<Preset> {
        if self.preset.name.is_empty() {
            return Err(ConfigError::parse(line, "preset has no name"));
        }
        match self.vco_count {
            Some(count) => self.preset.vcos.resize_with(count, VcoPreset::default),
            None if self.preset.vcos.is_empty() => self.preset.vcos.push(VcoPreset::default()),
            None => {}
        }
        if let Some(count) = self.conn_count {
            self.preset
                .connections
                .resize_with(count, ConnectionPreset::default);
        }
        Ok(self.preset)
    }
}

fn number(value: &str, line: usize, key: &str) -> ParseResult<f64> {
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ConfigError::parse(
            line,
            format!("{key}: expected a number, found '{value}'"),
        )),
    }
}

fn integer(value: &str, line: usize, key: &str) -> ParseResult<i64> {
    value.parse::<i64>().map_err(|_| {
        ConfigError::parse(line, format!("{key}: expected an integer, found '{value}'"))
    })
}

fn count(value: &str, line: usize, key: &str, max: usize) -> ParseResult<usize> {
    match value.parse::<usize>() {
        Ok(n) if n <= max => Ok(n),
        Ok(n) => Err(ConfigError::parse(line, format!("{key}: {n} exceeds {max}"))),
        Err(_) => Err(ConfigError::parse(
            line,
            format!("{key}: expected a count, found '{value}'"),
        )),
    }
}

fn boolean(value: &str, line: usize, key: &str) -> ParseResult<bool> {
    if value == "1" || value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value == "0" || value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(ConfigError::parse(
            line,
            format!("{key}: expected 0 or 1, found '{value}'"),
        ))
    }
}

/// A waveform given either as its tag or by name.
fn waveform(value: &str, line: usize, key: &str) -> ParseResult<i64> {
    if let Ok(tag) = value.parse::<i64>() {
        return Ok(tag);
    }
    Waveform::from_name(value)
        .map(|w| i64::from(w.index()))
        .ok_or_else(|| ConfigError::parse(line, format!("{key}: unknown waveform '{value}'")))
}

/// Split `vco3_detune` into `(3, "detune")` for prefix `vco`.
fn indexed<'a>(key: &'a str, prefix: &str, line: usize) -> ParseResult<Option<(usize, &'a str)>> {
    let Some(rest) = key.strip_prefix(prefix) else {
        return Ok(None);
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return Ok(None);
    }
    let Some(field) = rest[digits..].strip_prefix('_') else {
        return Ok(None);
    };
    let index = rest[..digits]
        .parse::<usize>()
        .map_err(|_| ConfigError::parse(line, format!("{key}: index out of range")))?;
    Ok(Some((index, field)))
}

fn envelope_field(
    env: &mut EnvelopePreset,
    field: &str,
    value: &str,
    line: usize,
    key: &str,
) -> ParseResult<bool> {
    let slot = match field {
        "attack" => &mut env.attack,
        "decay" => &mut env.decay,
        "sustain" => &mut env.sustain,
        "release" => &mut env.release,
        _ => return Ok(false),
    };
    *slot = number(value, line, key)?;
    Ok(true)
}

fn lfo_field(
    lfo: &mut LfoPreset,
    field: &str,
    value: &str,
    line: usize,
    key: &str,
) -> ParseResult<bool> {
    match field {
        "waveform_type" | "waveform" => lfo.waveform_type = waveform(value, line, key)?,
        "rate" => lfo.rate = number(value, line, key)?,
        "depth" => lfo.depth = number(value, line, key)?,
        _ => return Ok(false),
    }
    Ok(true)
}

/// Apply one `key=value` line. Returns false for unknown keys.
fn apply(section: &mut Section, key: &str, value: &str, line: usize) -> ParseResult<bool> {
    let p = &mut section.preset;
    match key {
        "name" => p.name = value.to_string(),
        "description" => p.description = value.to_string(),
        "author" => p.author = value.to_string(),
        "category" => p.category = integer(value, line, key)?,
        "timestamp" => p.timestamp = number(value, line, key)?,
        "vco_count" => section.vco_count = Some(count(value, line, key, MAX_VCOS)?),
        "mod_conn_count" => {
            section.conn_count = Some(count(value, line, key, MAX_CONNECTIONS)?);
        }
        "vcf_type" => p.vcf.filter_type = integer(value, line, key)?,
        "vcf_response" => p.vcf.response = integer(value, line, key)?,
        "vcf_cutoff_freq" | "vcf_cutoff" => p.vcf.cutoff_freq = number(value, line, key)?,
        "vcf_resonance" | "vcf_res" => p.vcf.resonance = number(value, line, key)?,
        "vcf_env_amount" => p.vcf.env_amount = number(value, line, key)?,
        "vca_response" => p.vca.response = integer(value, line, key)?,
        "vca_gain" => p.vca.gain = number(value, line, key)?,
        "master_volume" => p.master_volume = number(value, line, key)?,
        "attack" | "decay" | "sustain" | "release" => {
            return envelope_field(&mut p.amp_env, key, value, line, key);
        }
        _ => {
            if let Some(field) = key.strip_prefix("filter_env_") {
                return envelope_field(&mut p.filter_env, field, value, line, key);
            }
            if let Some(field) = key.strip_prefix("env_") {
                return envelope_field(&mut p.amp_env, field, value, line, key);
            }
            if let Some((index, field)) = indexed(key, "lfo", line)? {
                return match p.lfos.get_mut(index) {
                    Some(lfo) => lfo_field(lfo, field, value, line, key),
                    None => Ok(false),
                };
            }
            if let Some((index, field)) = indexed(key, "vco", line)? {
                return vco_field(section, index, field, value, line, key);
            }
            if let Some((index, field)) = indexed(key, "conn", line)? {
                return connection_field(section, index, field, value, line, key);
            }
            return Ok(false);
        }
    }
    Ok(true)
}

fn vco_field(
    section: &mut Section,
    index: usize,
    field: &str,
    value: &str,
    line: usize,
    key: &str,
) -> ParseResult<bool> {
    if !matches!(
        field,
        "waveform_type"
            | "waveform"
            | "frequency"
            | "detune"
            | "level"
            | "pulse_width"
            | "fm_depth"
            | "sample_hold_rate"
    ) {
        return Ok(false);
    }
    let vco = section.vco(index, line)?;
    match field {
        "waveform_type" | "waveform" => vco.waveform_type = waveform(value, line, key)?,
        "frequency" => vco.frequency = number(value, line, key)?,
        "detune" => vco.detune = number(value, line, key)?,
        "level" => vco.level = number(value, line, key)?,
        "pulse_width" => vco.pulse_width = number(value, line, key)?,
        "fm_depth" => vco.fm_depth = number(value, line, key)?,
        _ => vco.sample_hold_rate = number(value, line, key)?,
    }
    Ok(true)
}

fn connection_field(
    section: &mut Section,
    index: usize,
    field: &str,
    value: &str,
    line: usize,
    key: &str,
) -> ParseResult<bool> {
    if !matches!(field, "source" | "destination" | "amount" | "active" | "name") {
        return Ok(false);
    }
    let link = section.connection(index, line)?;
    match field {
        "source" => link.source = integer(value, line, key)?,
        "destination" => link.destination = integer(value, line, key)?,
        "amount" => link.amount = number(value, line, key)?,
        "active" => link.active = boolean(value, line, key)?,
        _ => link.name = value.to_string(),
    }
    Ok(true)
}

/// Parse every `[Preset]` section in `text`, in file order.
///
/// Duplicate names are returned as they appear; [`PresetBank`](crate::PresetBank)
/// resolves them.
pub fn parse_presets(text: &str) -> Result<Vec<Preset>, ConfigError> {
    let mut presets = Vec::new();
    let mut current: Option<Section> = None;
    let mut opened_at = 0;

    for (i, raw) in text.lines().enumerate() {
        let line = i + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        if trimmed == BEGIN {
            if current.is_some() {
                return Err(ConfigError::parse(
                    line,
                    format!("{BEGIN} inside the section opened at line {opened_at}"),
                ));
            }
            current = Some(Section::new());
            opened_at = line;
            continue;
        }
        if trimmed == END {
            let Some(section) = current.take() else {
                return Err(ConfigError::parse(line, format!("{END} without {BEGIN}")));
            };
            presets.push(section.finish(line)?);
            continue;
        }

        let Some(section) = current.as_mut() else {
            return Err(ConfigError::parse(
                line,
                format!("expected {BEGIN}, found '{trimmed}'"),
            ));
        };
        let Some((key, value)) = trimmed.split_once('=') else {
            return Err(ConfigError::parse(
                line,
                format!("expected key=value, found '{trimmed}'"),
            ));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(ConfigError::parse(line, "empty key"));
        }
        if !apply(section, key, value.trim(), line)? {
            tracing::debug!(line, key, "ignoring unknown preset key");
        }
    }

    if current.is_some() {
        return Err(ConfigError::parse(
            opened_at,
            format!("section is never closed with {END}"),
        ));
    }
    Ok(presets)
}

fn one_line(s: &str) -> String {
    s.replace(['\r', '\n'], " ").trim().to_string()
}

fn put(out: &mut String, key: &str, value: impl std::fmt::Display) {
    // Writing to a String cannot fail.
    let _ = writeln!(out, "{key}={value}");
}

/// Append one `[Preset]` section for `preset` in canonical key order.
pub fn write_preset(preset: &Preset, out: &mut String) {
    let p = preset;
    out.push_str(BEGIN);
    out.push('\n');
    put(out, "name", one_line(&p.name));
    put(out, "description", one_line(&p.description));
    put(out, "author", one_line(&p.author));
    put(out, "category", p.category);
    put(out, "timestamp", p.timestamp);

    put(out, "vco_count", p.vcos.len());
    for (i, vco) in p.vcos.iter().enumerate() {
        put(out, &format!("vco{i}_waveform_type"), vco.waveform_type);
        put(out, &format!("vco{i}_frequency"), vco.frequency);
        put(out, &format!("vco{i}_detune"), vco.detune);
        put(out, &format!("vco{i}_level"), vco.level);
        put(out, &format!("vco{i}_pulse_width"), vco.pulse_width);
        put(out, &format!("vco{i}_fm_depth"), vco.fm_depth);
        put(out, &format!("vco{i}_sample_hold_rate"), vco.sample_hold_rate);
    }

    put(out, "vcf_type", p.vcf.filter_type);
    put(out, "vcf_response", p.vcf.response);
    put(out, "vcf_cutoff_freq", p.vcf.cutoff_freq);
    put(out, "vcf_resonance", p.vcf.resonance);
    put(out, "vcf_env_amount", p.vcf.env_amount);
    put(out, "vca_response", p.vca.response);
    put(out, "vca_gain", p.vca.gain);

    for (prefix, env) in [("env", &p.amp_env), ("filter_env", &p.filter_env)] {
        put(out, &format!("{prefix}_attack"), env.attack);
        put(out, &format!("{prefix}_decay"), env.decay);
        put(out, &format!("{prefix}_sustain"), env.sustain);
        put(out, &format!("{prefix}_release"), env.release);
    }
    for (i, lfo) in p.lfos.iter().enumerate() {
        put(out, &format!("lfo{i}_waveform_type"), lfo.waveform_type);
        put(out, &format!("lfo{i}_rate"), lfo.rate);
        put(out, &format!("lfo{i}_depth"), lfo.depth);
    }
    put(out, "master_volume", p.master_volume);

    put(out, "mod_conn_count", p.connections.len());
    for (i, link) in p.connections.iter().enumerate() {
        put(out, &format!("conn{i}_source"), link.source);
        put(out, &format!("conn{i}_destination"), link.destination);
        put(out, &format!("conn{i}_amount"), link.amount);
        put(out, &format!("conn{i}_active"), u8::from(link.active));
        put(out, &format!("conn{i}_name"), one_line(&link.name));
    }
    out.push_str(END);
    out.push('\n');
}

/// Canonical text for `presets`, separated by blank lines.
pub fn presets_to_string(presets: &[Preset]) -> String {
    let mut out = String::new();
    for (i, preset) in presets.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        write_preset(preset, &mut out);
    }
    out
}
