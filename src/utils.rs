use rand::{rngs::StdRng, Rng};

/// Picks one of the items with the highest score, uniformly among ties.
///
/// Ties are resolved with reservoir sampling in a single pass, so no buffer
/// of candidates is allocated.
///
/// # Parameters
/// - `items`: Candidates to score.
/// - `score`: Scoring function. Scores are compared with `==` and `>`, the
///            caller must not produce `NaN`.
/// - `rng`: A mutable reference to a `StdRng`, seeded for reproducible choices.
///
/// # Returns
/// The chosen item, or `None` if `items` is empty.
pub fn choose_max<'a, T, S, F>(items: &'a [T], mut score: F, rng: &mut StdRng) -> Option<&'a T>
where
    S: PartialOrd,
    F: FnMut(&T) -> S
{
    let mut best: Option<(&'a T, S)> = None;
    let mut ties: u32 = 0;

    for item in items {
        let value = score(item);

        let replace = match &best {
            Some((_, best_value)) if value == *best_value => {
                ties += 1;
                rng.random_range(0..ties) == 0
            }
            Some((_, best_value)) if !(value > *best_value) => false,
            _ => {
                ties = 1;
                true
            }
        };

        if replace {
            best = Some((item, value));
        }
    }

    best.map(|(item, _)| item)
}
