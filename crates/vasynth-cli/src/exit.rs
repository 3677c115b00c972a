//! Process exit codes.

use vasynth_config::ConfigError;
use vasynth_synth::SynthError;

/// Generic failure.
pub const FAILURE: u8 = 1;
/// An audio or MIDI device could not be opened or used.
pub const DEVICE: u8 = 2;
/// A preset or config file failed to parse or validate.
pub const PARSE: u8 = 3;

/// Pick the exit code for the first recognised error in the chain.
pub fn code_for(err: &anyhow::Error) -> u8 {
    for cause in err.chain() {
        if let Some(io) = cause.downcast_ref::<vasynth_io::Error>() {
            match io {
                vasynth_io::Error::NoDevice
                | vasynth_io::Error::DeviceNotFound(_)
                | vasynth_io::Error::Stream(_)
                | vasynth_io::Error::Midi(_) => return DEVICE,
                vasynth_io::Error::Engine(_) => return PARSE,
                _ => {}
            }
        }
        if let Some(config) = cause.downcast_ref::<ConfigError>()
            && config.is_parse_error()
        {
            return PARSE;
        }
        if cause.downcast_ref::<SynthError>().is_some() {
            return PARSE;
        }
    }
    FAILURE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_errors_map_to_device_code() {
        let err = anyhow::Error::new(vasynth_io::Error::NoDevice).context("opening output");
        assert_eq!(code_for(&err), DEVICE);
    }

    #[test]
    fn parse_errors_map_to_parse_code() {
        let err = anyhow::Error::new(ConfigError::parse(4, "bad")).context("loading bank");
        assert_eq!(code_for(&err), PARSE);
    }

    #[test]
    fn missing_files_are_generic() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = anyhow::Error::new(ConfigError::read_file("x.preset", io));
        assert_eq!(code_for(&err), FAILURE);
    }
}
