//! C ABI — the classic `ru_tts_transfer` interface for foreign callers.
//!
//! Functions are `#[no_mangle] extern "C"` so C, C++ and JNI bridges can
//! call them through a plain header without any wrapper code.
//!
//! ## Memory contract
//!
//! | Object             | Owner                                        |
//! |--------------------|----------------------------------------------|
//! | configuration      | caller; read for the duration of the call    |
//! | text               | caller; NUL-terminated KOI8-R bytes          |
//! | wave buffer        | caller; filled and handed to the callback    |
//!
//! Nothing is allocated on the caller's behalf and nothing outlives the
//! call, so there are no free functions.

use std::ffi::{c_char, c_int, c_void};

use crate::config::Config;

/// Callback consuming one buffer of signed 8-bit samples.
/// A non-zero return aborts the synthesis.
pub type RuTtsCallback =
    Option<unsafe extern "C" fn(buffer: *mut c_void, size: usize, user_data: *mut c_void) -> c_int>;

/// Speech parameters, field for field the [`Config`] record.
#[repr(C)]
pub struct RuTtsConf {
    pub speech_rate: c_int,
    pub voice_pitch: c_int,
    pub intonation: c_int,
    pub general_gap_factor: c_int,
    pub comma_gap_factor: c_int,
    pub dot_gap_factor: c_int,
    pub semicolon_gap_factor: c_int,
    pub colon_gap_factor: c_int,
    pub question_gap_factor: c_int,
    pub exclamation_gap_factor: c_int,
    pub intonational_gap_factor: c_int,
    pub flags: c_int,
}

impl From<&RuTtsConf> for Config {
    fn from(c: &RuTtsConf) -> Config {
        Config {
            speech_rate: c.speech_rate,
            voice_pitch: c.voice_pitch,
            intonation: c.intonation,
            general_gap_factor: c.general_gap_factor,
            comma_gap_factor: c.comma_gap_factor,
            dot_gap_factor: c.dot_gap_factor,
            semicolon_gap_factor: c.semicolon_gap_factor,
            colon_gap_factor: c.colon_gap_factor,
            question_gap_factor: c.question_gap_factor,
            exclamation_gap_factor: c.exclamation_gap_factor,
            intonational_gap_factor: c.intonational_gap_factor,
            flags: c.flags as u32,
        }
    }
}

/// Initialize a configuration structure with the default values.
///
/// # Safety
/// `config` must point to a writable [`RuTtsConf`].
#[no_mangle]
pub unsafe extern "C" fn ru_tts_config_init(config: *mut RuTtsConf) {
    if config.is_null() {
        return;
    }
    let defaults = Config::default();
    unsafe {
        *config = RuTtsConf {
            speech_rate: defaults.speech_rate,
            voice_pitch: defaults.voice_pitch,
            intonation: defaults.intonation,
            general_gap_factor: defaults.general_gap_factor,
            comma_gap_factor: defaults.comma_gap_factor,
            dot_gap_factor: defaults.dot_gap_factor,
            semicolon_gap_factor: defaults.semicolon_gap_factor,
            colon_gap_factor: defaults.colon_gap_factor,
            question_gap_factor: defaults.question_gap_factor,
            exclamation_gap_factor: defaults.exclamation_gap_factor,
            intonational_gap_factor: defaults.intonational_gap_factor,
            flags: defaults.flags as c_int,
        };
    }
}

/// Perform the TTS transformation for a NUL-terminated KOI8-R text.
///
/// Produced wave data is delivered chunk by chunk through `wave_consumer`
/// using the caller's `wave_buffer` of `wave_buffer_size` bytes; a non-zero
/// consumer return terminates the speech immediately.
///
/// # Safety
/// `config` and `text` must be valid for reads, `wave_buffer` for
/// `wave_buffer_size` writable bytes; `text` must be NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn ru_tts_transfer(
    config: *const RuTtsConf,
    text: *const c_char,
    wave_buffer: *mut c_void,
    wave_buffer_size: usize,
    wave_consumer: RuTtsCallback,
    user_data: *mut c_void,
) {
    let (Some(callback), false) = (wave_consumer, config.is_null() || text.is_null()) else {
        return;
    };
    if wave_buffer.is_null() || wave_buffer_size == 0 {
        return;
    }

    let config = Config::from(unsafe { &*config });
    let text = unsafe { std::ffi::CStr::from_ptr(text) }.to_bytes();
    let buffer =
        unsafe { std::slice::from_raw_parts_mut(wave_buffer as *mut u8, wave_buffer_size) };

    crate::transfer(&config, text, buffer, |chunk: &[u8]| {
        let rc = unsafe {
            callback(chunk.as_ptr() as *mut c_void, chunk.len(), user_data)
        };
        rc != 0
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe extern "C" fn count_bytes(
        _buffer: *mut c_void,
        size: usize,
        user_data: *mut c_void,
    ) -> c_int {
        let total = unsafe { &mut *(user_data as *mut usize) };
        *total += size;
        0
    }

    unsafe extern "C" fn abort_immediately(
        _buffer: *mut c_void,
        _size: usize,
        _user_data: *mut c_void,
    ) -> c_int {
        1
    }

    #[test]
    fn test_config_init_matches_defaults() {
        let mut conf = RuTtsConf {
            speech_rate: 0,
            voice_pitch: 0,
            intonation: 0,
            general_gap_factor: 0,
            comma_gap_factor: 0,
            dot_gap_factor: 0,
            semicolon_gap_factor: 0,
            colon_gap_factor: 0,
            question_gap_factor: 0,
            exclamation_gap_factor: 0,
            intonational_gap_factor: 0,
            flags: 0,
        };
        unsafe { ru_tts_config_init(&mut conf) };
        assert_eq!(conf.speech_rate, 100);
        assert_eq!(conf.flags, (crate::DEC_SEP_POINT | crate::DEC_SEP_COMMA) as c_int);
    }

    #[test]
    fn test_transfer_delivers_audio() {
        let mut conf = RuTtsConf {
            speech_rate: 100,
            voice_pitch: 100,
            intonation: 100,
            general_gap_factor: 100,
            comma_gap_factor: 100,
            dot_gap_factor: 100,
            semicolon_gap_factor: 100,
            colon_gap_factor: 100,
            question_gap_factor: 100,
            exclamation_gap_factor: 100,
            intonational_gap_factor: 100,
            flags: 0,
        };
        unsafe { ru_tts_config_init(&mut conf) };
        let mut wave = [0u8; 1024];
        let mut total: usize = 0;
        unsafe {
            ru_tts_transfer(
                &conf,
                c"da.".as_ptr(),
                wave.as_mut_ptr() as *mut c_void,
                wave.len(),
                Some(count_bytes),
                &mut total as *mut usize as *mut c_void,
            );
        }
        assert!(total > 1000, "only {} bytes delivered", total);
    }

    #[test]
    fn test_transfer_null_arguments_are_ignored() {
        unsafe {
            ru_tts_transfer(
                std::ptr::null(),
                c"da.".as_ptr(),
                std::ptr::null_mut(),
                0,
                Some(abort_immediately),
                std::ptr::null_mut(),
            );
            ru_tts_transfer(
                std::ptr::null(),
                std::ptr::null(),
                std::ptr::null_mut(),
                0,
                None,
                std::ptr::null_mut(),
            );
        }
    }
}
