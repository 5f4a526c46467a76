//! End-to-end properties of the theory engines through the public API

use tonality_core::config::{EngineConfig, KeyDetectionConfig};
use tonality_core::types::time::beats;
use tonality_core::types::*;
use tonality_core::TheoryError;

fn pitches(midi: &[i32]) -> Vec<Pitch> {
    midi.iter().map(|&m| Pitch::new(m)).collect()
}

#[test]
fn every_scale_follows_its_step_pattern() {
    for root in PitchClass::all() {
        for scale_type in ScaleType::ALL {
            let scale = Scale::build(root, scale_type, 1);
            let offsets: Vec<u8> = scale
                .pitches()
                .iter()
                .map(|p| (p.midi() - scale.pitches()[0].midi()) as u8)
                .collect();
            let mut expected = scale_type.offsets();
            expected.push(12);
            assert_eq!(offsets, expected, "{} {}", root, scale_type.name());
        }
    }
}

#[test]
fn built_chords_are_recognized() {
    for root in PitchClass::all() {
        for quality in ChordQuality::ALL {
            let chord = Chord::root_position(root, quality);
            let candidates = analyze_chord(chord.pitches());
            assert!(
                candidates
                    .iter()
                    .any(|c| c.chord.root() == root && c.chord.quality() == quality),
                "{} {} not among its own readings",
                root,
                quality.name()
            );
        }
    }
}

#[test]
fn bare_major_triad_is_unambiguous() {
    let candidates = analyze_chord(&pitches(&[60, 64, 67]));
    let top = &candidates[0];
    assert_eq!(top.chord.root(), PitchClass::C);
    assert_eq!(top.chord.quality(), ChordQuality::Major);
    assert!(top.extra.is_empty());
}

#[test]
fn c_major_material_detects_c_major() {
    let melody = pitches(&[60, 64, 67, 72, 62, 65, 69, 71, 60, 67, 64]);
    let histogram = PitchHistogram::from_pitches(&melody);
    let candidates = detect_key(&histogram, &KeyDetectionConfig::default()).unwrap();

    let c_major = Key::major(PitchClass::C);
    assert_eq!(candidates[0].key, c_major);
    assert!(candidates[..3]
        .iter()
        .any(|c| c.key == Key::minor(PitchClass::A)));

    // Any key sharing fewer than all seven pitch classes ranks lower
    let diatonic = c_major.pitch_classes();
    let top = candidates[0].confidence;
    for candidate in &candidates[1..] {
        let shared = candidate
            .key
            .pitch_classes()
            .iter()
            .filter(|pc| diatonic.contains(pc))
            .count();
        if shared < 7 {
            assert!(candidate.confidence < top, "{}", candidate);
        }
    }
}

#[test]
fn modulation_follows_event_windows() {
    let mut events = Vec::new();
    for (i, midi) in [60, 64, 67, 65, 62, 71, 72, 60].iter().enumerate() {
        events.push(NoteEvent::new(Pitch::new(*midi), beats(i as i64), beats(1), 90));
    }
    for (i, midi) in [67, 71, 74, 66, 69, 72, 62, 67].iter().enumerate() {
        events.push(NoteEvent::new(Pitch::new(*midi), beats(8 + i as i64), beats(1), 90));
    }
    let boundaries = [beats(0), beats(8)];
    let windows = PitchHistogram::windows(&events, &boundaries);
    let modulations =
        analyze_modulations(&windows, &boundaries, &KeyDetectionConfig::default()).unwrap();

    assert_eq!(modulations.len(), 1);
    assert_eq!(modulations[0].at, beats(8));
    assert_eq!(modulations[0].from, Key::major(PitchClass::C));
    assert_eq!(modulations[0].to.key, Key::major(PitchClass::G));
}

#[test]
fn pop_progression_resolves_and_cadences() {
    let key = Key::major(PitchClass::C);
    let numerals = parse_numerals("I vi IV V").unwrap();
    let chords = resolve_progression(key, &numerals).unwrap();

    let symbols: Vec<String> = chords.iter().map(|c| c.symbol(key.spelling())).collect();
    assert_eq!(symbols, vec!["C", "Am", "F", "G"]);

    let functions: Vec<HarmonicFunction> =
        chords.iter().map(|c| classify_function(c, key)).collect();
    assert_eq!(
        functions,
        vec![
            HarmonicFunction::Tonic,
            HarmonicFunction::Tonic,
            HarmonicFunction::Subdominant,
            HarmonicFunction::Dominant,
        ]
    );

    assert_eq!(identify_cadence(&chords[2..], key), CadenceType::Half);
    let home = vec![chords[3].clone(), chords[0].clone()];
    assert_eq!(identify_cadence(&home, key), CadenceType::Authentic);
}

#[test]
fn analysis_labels_resolve_back_to_the_same_chord() {
    let key = Key::major(PitchClass::E_FLAT);
    for chord in key.diatonic_sevenths() {
        let numeral = RomanNumeral::analyze(&chord, key);
        let resolved = numeral.resolve(key).unwrap();
        assert_eq!(resolved.root(), chord.root(), "{}", numeral);
        assert_eq!(resolved.quality(), chord.quality(), "{}", numeral);
    }
}

#[test]
fn voiced_progressions_avoid_parallels() {
    let leader = VoiceLeader::new(EngineConfig::default().voice_leading);
    let cases = [
        (Key::major(PitchClass::C), "I IV V I"),
        (Key::major(PitchClass::C), "I vi ii V7 I"),
        (Key::major(PitchClass::B_FLAT), "I vi IV V"),
        (Key::minor(PitchClass::D), "i iv V i"),
        (Key::minor(PitchClass::D), "i VI iv V"),
    ];

    for (key, progression) in cases {
        let numerals = parse_numerals(progression).unwrap();
        let chords = resolve_progression(key, &numerals).unwrap();
        let (voiced, reports) = leader.voice_progression(&chords, 4, &[]).unwrap();
        assert_eq!(voiced.len(), chords.len());
        for report in &reports {
            assert!(
                !report.violations.iter().any(|v| v.is_parallel()),
                "{} in {}: {}",
                progression,
                key,
                report
            );
        }
    }
}

#[test]
fn optimizing_twice_changes_nothing() {
    let leader = VoiceLeader::default();
    let key = Key::major(PitchClass::G);
    let chords = resolve_progression(key, &parse_numerals("I vi IV ii V7 I").unwrap()).unwrap();

    // Start from block chords in close position, a deliberately poor voicing
    let blocky: Vec<VoicedChord> = chords
        .iter()
        .map(|c| {
            let mut voices = c.pitches().to_vec();
            voices.insert(0, c.pitches()[0] - 12);
            voices.truncate(4);
            VoicedChord::new(c.clone(), voices)
        })
        .collect();

    let once = leader.optimize(&blocky, &[]).unwrap();
    let twice = leader.optimize(&once, &[]).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn too_many_tones_without_omission_is_infeasible() {
    let leader = VoiceLeader::default();
    let chord = Chord::root_position(PitchClass::C, ChordQuality::Major9);
    let result = leader.voice_progression(&[chord], 3, &[]);
    assert!(matches!(
        result,
        Err(TheoryError::InfeasibleVoicing { voices: 3, .. })
    ));
}

#[test]
fn seeded_voicings_are_in_close_position() {
    let leader = VoiceLeader::default();
    let ranges = PitchRange::defaults(4);
    for symbol in ["C", "G", "Am", "Dm", "F", "Bb", "G7", "F#m", "Ebmaj7"] {
        let chord = Chord::from_symbol(symbol).unwrap();
        let seeded = leader.seed(&chord, &ranges).unwrap();
        let p = seeded.pitches();

        // Upper three voices within an octave, stacked without crossing
        assert!(p[3] - p[1] <= 12, "{} seeded as {}", symbol, seeded);
        assert!(p.windows(2).all(|w| w[0] < w[1]), "{}", seeded);
        assert_eq!(p[0].pitch_class(), chord.bass(), "{}", seeded);
        for (pitch, range) in p.iter().zip(&ranges) {
            assert!(range.contains(*pitch), "{} outside {:?}", pitch, range);
        }
    }
}

#[test]
fn near_equal_keys_tie_within_epsilon() {
    // C-heavy diatonic material that C major and A minor explain almost equally
    let histogram = PitchHistogram::from_weights([
        (PitchClass::C, 4.0),
        (PitchClass::D, 2.0),
        (PitchClass::E, 3.0),
        (PitchClass::F, 2.0),
        (PitchClass::G, 2.0),
        (PitchClass::A, 3.0),
        (PitchClass::B, 1.0),
    ]);
    let config = KeyDetectionConfig::default();
    let candidates = detect_key(&histogram, &config).unwrap();

    assert_eq!(candidates[0].key, Key::major(PitchClass::C));
    assert_eq!(candidates[1].key, Key::minor(PitchClass::A));
    let gap = candidates[0].confidence - candidates[1].confidence;
    assert!(gap > 0.001 && gap < config.tie_epsilon, "gap {}", gap);

    let ties = leading_ties(&candidates, config.tie_epsilon);
    assert_eq!(ties.len(), 2);
    assert_eq!(leading_ties(&candidates, 0.001).len(), 1);
}

#[test]
fn suggestions_measure_motion_from_the_previous_chord() {
    let key = Key::major(PitchClass::C);
    let config = EngineConfig::default();
    let dominant = Chord::from_symbol("G7").unwrap();

    let fresh = suggest_next_chord(&[], key, Style::CommonPractice, &config);
    assert!(fresh.iter().all(|s| s.voice_leading == 1.0));

    let suggestions = suggest_next_chord(&[dominant], key, Style::CommonPractice, &config);
    let tonic = suggestions
        .iter()
        .find(|s| s.numeral.to_string() == "I")
        .unwrap();
    assert!(tonic.voice_leading > 0.0 && tonic.voice_leading < 1.0, "{}", tonic);

    let mut components: Vec<f64> = suggestions.iter().map(|s| s.voice_leading).collect();
    components.sort_by(f64::total_cmp);
    components.dedup();
    assert!(components.len() > 2, "{:?}", components);

    for s in &suggestions {
        let expected = config.suggestion.functional_weight * s.functional
            + config.suggestion.voice_leading_weight * s.voice_leading;
        assert!((s.score - expected).abs() < 1e-9, "{}", s);
    }
}
