use kognit_core::{DigitSequence, InkColor, StroopStimulus};
use rand::Rng;
use rand::seq::SliceRandom;

/// First batch at which the schedules stop changing.
pub const FINAL_SCHEDULED_BATCH: u32 = 5;

/// Active palette for a batch: 4 colours in batch 1, one more per batch, all 8 from batch 5.
pub fn palette_for_batch(batch: u32) -> &'static [InkColor] {
    let size = match batch.max(1) {
        1 => 4,
        2 => 5,
        3 => 6,
        4 => 7,
        _ => 8,
    };
    &InkColor::ALL[..size]
}

/// Probability that a trial in this batch is congruent.
pub fn congruent_chance(batch: u32) -> f64 {
    match batch.max(1) {
        1 => 0.30,
        2 => 0.25,
        3 => 0.20,
        4 => 0.15,
        _ => 0.10,
    }
}

/// One Stroop trial as presented: the stimulus and the shuffled answer buttons.
#[derive(Debug, Clone, PartialEq)]
pub struct StroopPrompt {
    pub batch: u32,
    pub stimulus: StroopStimulus,
    pub options: Vec<InkColor>,
}

pub fn stroop_prompt<R: Rng + ?Sized>(rng: &mut R, batch: u32) -> StroopPrompt {
    let palette = palette_for_batch(batch);
    let word = palette[rng.random_range(0..palette.len())];

    let ink = if rng.random_bool(congruent_chance(batch)) {
        word
    } else {
        let others: Vec<InkColor> = palette.iter().copied().filter(|c| *c != word).collect();
        others[rng.random_range(0..others.len())]
    };

    let mut options = palette.to_vec();
    options.shuffle(rng);

    StroopPrompt {
        batch: batch.max(1),
        stimulus: StroopStimulus { word, ink },
        options,
    }
}

/// `level` independent uniform digits.
pub fn digit_sequence<R: Rng + ?Sized>(rng: &mut R, level: u32) -> DigitSequence {
    let len = level.max(1) as usize;
    DigitSequence((0..len).map(|_| rng.random_range(0..=9u8)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn palette_grows_with_batch() {
        let sizes: Vec<usize> = (0..=7).map(|b| palette_for_batch(b).len()).collect();
        assert_eq!(sizes, vec![4, 4, 5, 6, 7, 8, 8, 8]);
        assert_eq!(palette_for_batch(1)[0], InkColor::Red);
        assert_eq!(palette_for_batch(2)[4], InkColor::Purple);
    }

    #[test]
    fn congruency_falls_with_batch() {
        let chances: Vec<f64> = (1..=6).map(congruent_chance).collect();
        assert_eq!(chances, vec![0.30, 0.25, 0.20, 0.15, 0.10, 0.10]);
        assert_eq!(congruent_chance(0), 0.30);
    }

    #[test]
    fn incongruent_ink_never_matches_word() {
        let mut rng = StdRng::seed_from_u64(7);
        for batch in 1..=FINAL_SCHEDULED_BATCH {
            for _ in 0..500 {
                let p = stroop_prompt(&mut rng, batch);
                if !p.stimulus.is_congruent() {
                    assert_ne!(p.stimulus.ink, p.stimulus.word);
                }
                let palette = palette_for_batch(batch);
                assert!(palette.contains(&p.stimulus.word));
                assert!(palette.contains(&p.stimulus.ink));
            }
        }
    }

    #[test]
    fn options_are_a_permutation_of_palette() {
        let mut rng = StdRng::seed_from_u64(11);
        for batch in 1..=6 {
            let p = stroop_prompt(&mut rng, batch);
            let mut got = p.options.clone();
            let mut want = palette_for_batch(batch).to_vec();
            got.sort_by_key(|c| c.name());
            want.sort_by_key(|c| c.name());
            assert_eq!(got, want);
        }
    }

    #[test]
    fn congruent_rate_tracks_schedule() {
        let mut rng = StdRng::seed_from_u64(3);
        let n = 20_000;
        let congruent = (0..n)
            .filter(|_| stroop_prompt(&mut rng, 1).stimulus.is_congruent())
            .count();
        let rate = congruent as f64 / n as f64;
        assert!((rate - 0.30).abs() < 0.02, "rate {rate}");
    }

    #[test]
    fn sequence_has_level_digits() {
        let mut rng = StdRng::seed_from_u64(5);
        for level in 1..=12 {
            let seq = digit_sequence(&mut rng, level);
            assert_eq!(seq.len(), level as usize);
            assert!(seq.digits().iter().all(|d| *d <= 9));
        }
        assert_eq!(digit_sequence(&mut rng, 0).len(), 1);
    }
}
