//! Secret word selection and role assignment.
//!
//! Common words do not repeat until every word of the category has been used
//! once; the same holds for imposter words, which additionally never equal the
//! round's common word.

use crate::error::{GameError, GameResult};
use crate::types::Game;
use rand::Rng;

/// Pick a word uniformly from `candidates`
fn pick<R: Rng + ?Sized>(candidates: &[&String], rng: &mut R) -> Option<String> {
    if candidates.is_empty() {
        return None;
    }
    Some(candidates[rng.random_range(0..candidates.len())].clone())
}

/// Choose the common word, starting a new cycle once every word has been used
pub(crate) fn select_common_word<R: Rng + ?Sized>(
    game: &mut Game,
    rng: &mut R,
) -> GameResult<String> {
    let mut unused: Vec<&String> = game
        .category
        .words
        .iter()
        .filter(|w| !game.used_common_words.contains(*w))
        .collect();

    if unused.is_empty() {
        game.used_common_words.clear();
        unused = game.category.words.iter().collect();
    }

    let word = pick(&unused, rng)
        .ok_or_else(|| GameError::CategoryExhausted(game.category.name.clone()))?;
    game.used_common_words.insert(word.clone());
    Ok(word)
}

/// Choose the imposter word. The used set is only reset when nothing unused is left.
pub(crate) fn select_imposter_word<R: Rng + ?Sized>(
    game: &mut Game,
    rng: &mut R,
) -> GameResult<String> {
    let common = game.common_word.as_deref();
    let eligible = |w: &&String| Some(w.as_str()) != common;

    let mut unused: Vec<&String> = game
        .category
        .words
        .iter()
        .filter(eligible)
        .filter(|w| !game.used_imposter_words.contains(*w))
        .collect();

    if unused.is_empty() {
        game.used_imposter_words.clear();
        unused = game.category.words.iter().filter(eligible).collect();
    }

    let word = pick(&unused, rng)
        .ok_or_else(|| GameError::CategoryExhausted(game.category.name.clone()))?;
    game.used_imposter_words.insert(word.clone());
    Ok(word)
}

/// Draw both words, choose the imposter and the first questioner.
///
/// Mutates `game` progressively; callers run it on a draft copy and only keep
/// the result on success.
pub(crate) fn assign_roles<R: Rng + ?Sized>(game: &mut Game, rng: &mut R) -> GameResult<()> {
    if game.players.is_empty() {
        return Err(GameError::precondition("Cannot assign roles without players"));
    }

    let common = select_common_word(game, rng)?;
    game.common_word = Some(common.clone());
    let imposter_word = select_imposter_word(game, rng)?;
    game.imposter_word = Some(imposter_word.clone());

    let imposter_index = rng.random_range(0..game.players.len());
    for (i, player) in game.players.iter_mut().enumerate() {
        player.is_imposter = i == imposter_index;
        player.assigned_word = Some(if i == imposter_index {
            imposter_word.clone()
        } else {
            common.clone()
        });
        player.has_voted = false;
        player.voted_for = None;
    }

    let first = rng.random_range(0..game.players.len());
    game.questioner_index = first;
    game.first_questioner_index = first;
    Ok(())
}
