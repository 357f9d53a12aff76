//! Kokoro voice catalogue.
//!
//! Voice ids and speaker indices for the Kokoro v1.0 multi-lingual model
//! (`kokoro-multi-lang-v1_0`). The speaker ids are the indices into the
//! packed `voices.bin` style matrix, as declared in the ONNX model's
//! `speaker2id` metadata.

/// `(voice_id, speaker_id)` pairs, in catalogue order.
static KOKORO_SPEAKERS: &[(&str, i32)] = &[
    // American English
    ("af_heart", 0),
    ("af_alloy", 1),
    ("af_aoede", 2),
    ("af_bella", 3),
    ("af_jessica", 4),
    ("af_kore", 5),
    ("af_nicole", 6),
    ("af_nova", 7),
    ("af_river", 8),
    ("af_sarah", 9),
    ("af_sky", 10),
    ("am_adam", 11),
    ("am_echo", 12),
    ("am_eric", 13),
    ("am_fenrir", 14),
    ("am_liam", 15),
    ("am_michael", 16),
    ("am_onyx", 17),
    ("am_puck", 18),
    ("am_santa", 19),
    // British English
    ("bf_alice", 20),
    ("bf_emma", 21),
    ("bf_isabella", 22),
    ("bf_lily", 23),
    ("bm_daniel", 24),
    ("bm_fable", 25),
    ("bm_george", 26),
    ("bm_lewis", 27),
    // Japanese
    ("jf_alpha", 28),
    ("jf_gongitsune", 29),
    ("jf_nezumi", 30),
    ("jf_tebukuro", 31),
    ("jm_kumo", 32),
    // Mandarin Chinese
    ("zf_xiaobei", 33),
    ("zf_xiaoni", 34),
    ("zf_xiaoxiao", 35),
    ("zf_xiaoyi", 36),
    ("zm_yunjian", 37),
    ("zm_yunxi", 38),
    ("zm_yunxia", 39),
    ("zm_yunyang", 40),
    // Spanish
    ("ef_dora", 41),
    ("em_alex", 42),
    ("em_santa", 43),
    // French
    ("ff_siwis", 44),
    // Hindi
    ("hf_alpha", 45),
    ("hf_beta", 46),
    ("hm_omega", 47),
    ("hm_psi", 48),
    // Italian
    ("if_sara", 49),
    ("im_nicola", 50),
    // Brazilian Portuguese
    ("pf_dora", 51),
    ("pm_alex", 52),
    ("pm_santa", 53),
];

/// Whether `voice_id` names a voice in the catalogue.
#[must_use]
pub fn is_known_voice(voice_id: &str) -> bool {
    KOKORO_SPEAKERS.iter().any(|(id, _)| *id == voice_id)
}

/// Map a voice id (e.g. `"af_bella"`) to the sherpa-onnx speaker id.
///
/// Unknown voices map to speaker 0 with a warning — callers are expected to
/// have resolved the voice through [`resolve_voice`] first.
#[must_use]
pub fn speaker_id(voice_id: &str) -> i32 {
    KOKORO_SPEAKERS
        .iter()
        .find(|(id, _)| *id == voice_id)
        .map_or_else(
            || {
                tracing::warn!(voice = %voice_id, "Unknown Kokoro voice — using default speaker 0");
                0
            },
            |(_, sid)| *sid,
        )
}

/// Resolve a requested voice against the catalogue.
///
/// Absent or unrecognized voices fall back to `default` (logged at warn).
#[must_use]
pub fn resolve_voice<'a>(requested: Option<&'a str>, default: &'a str) -> &'a str {
    match requested {
        Some(id) if is_known_voice(id) => id,
        Some(id) => {
            tracing::warn!(voice = %id, fallback = %default, "Unrecognized voice, falling back");
            default
        }
        None => default,
    }
}

/// All voice ids in the catalogue, in order.
pub fn available_voices() -> impl Iterator<Item = &'static str> {
    KOKORO_SPEAKERS.iter().map(|(id, _)| *id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_has_all_kokoro_v1_voices() {
        assert_eq!(available_voices().count(), 54);
    }

    #[test]
    fn speaker_ids_are_unique_and_contiguous() {
        let mut ids: Vec<i32> = KOKORO_SPEAKERS.iter().map(|(_, sid)| *sid).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), KOKORO_SPEAKERS.len());
        assert_eq!(ids[0], 0);
        assert_eq!(*ids.last().unwrap(), i32::try_from(ids.len()).unwrap() - 1);
    }

    #[test]
    fn known_voice_resolves_to_itself() {
        assert_eq!(resolve_voice(Some("bm_fable"), "af_bella"), "bm_fable");
    }

    #[test]
    fn unknown_voice_falls_back_to_default() {
        assert_eq!(resolve_voice(Some("not_a_voice"), "af_bella"), "af_bella");
        assert_eq!(resolve_voice(None, "af_bella"), "af_bella");
    }

    #[test]
    fn unknown_speaker_id_is_zero() {
        assert_eq!(speaker_id("not_a_voice"), 0);
        assert_eq!(speaker_id("af_bella"), 3);
    }
}
