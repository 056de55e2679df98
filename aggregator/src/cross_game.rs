//! Cross-game aggregation (spec §4.5): weighted-mean trait scores across
//! a player's games, blended with the game-level novelty/staleness
//! formulas that read the player's opening repertoire as a whole.

use crate::traits::GameTraitScores;

#[derive(Debug, Clone)]
pub struct GameContribution {
    pub trait_scores: GameTraitScores,
    pub move_level_novelty: f64,
    pub move_level_staleness: f64,
    pub canonical_opening: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerTraitScores {
    pub tactical: f64,
    pub positional: f64,
    pub aggressive: f64,
    pub patient: f64,
    pub novelty: f64,
    pub staleness: f64,
}

fn weighted_mean(pairs: &[(f64, usize)]) -> f64 {
    let total_weight: usize = pairs.iter().map(|(_, w)| *w).sum();
    if total_weight == 0 {
        return 50.0;
    }
    pairs.iter().map(|(v, w)| v * *w as f64).sum::<f64>() / total_weight as f64
}

/// Diversity (0-100, unique/total as a percentage) and the top opening's
/// share of the total (0-1 fraction), over every game with a known
/// canonical opening.
fn opening_repertoire_stats(games: &[GameContribution]) -> (f64, f64) {
    use std::collections::HashMap;

    let names: Vec<&str> = games.iter().filter_map(|g| g.canonical_opening.as_deref()).collect();
    if names.is_empty() {
        return (50.0, 0.0);
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for name in &names {
        *counts.entry(name).or_insert(0) += 1;
    }

    let diversity = counts.len() as f64 / names.len() as f64 * 100.0;
    let top_share = counts.values().copied().max().unwrap_or(0) as f64 / names.len() as f64;
    (diversity, top_share)
}

fn clamp_0_100(v: f64) -> f64 {
    v.clamp(0.0, 100.0)
}

pub fn aggregate_player_traits(games: &[GameContribution]) -> PlayerTraitScores {
    if games.is_empty() {
        return PlayerTraitScores {
            tactical: 50.0,
            positional: 50.0,
            aggressive: 50.0,
            patient: 50.0,
            novelty: 50.0,
            staleness: 50.0,
        };
    }

    let tactical = weighted_mean(
        &games.iter().map(|g| (g.trait_scores.tactical, g.trait_scores.total_moves)).collect::<Vec<_>>(),
    );
    let positional = weighted_mean(
        &games.iter().map(|g| (g.trait_scores.positional, g.trait_scores.total_moves)).collect::<Vec<_>>(),
    );
    let aggressive = weighted_mean(
        &games.iter().map(|g| (g.trait_scores.aggressive, g.trait_scores.total_moves)).collect::<Vec<_>>(),
    );
    let patient = weighted_mean(
        &games.iter().map(|g| (g.trait_scores.patient, g.trait_scores.total_moves)).collect::<Vec<_>>(),
    );

    let (diversity, top_share) = opening_repertoire_stats(games);
    let novelty_game = clamp_0_100(25.0 + diversity * 0.6 - top_share * 80.0);
    let staleness_game = clamp_0_100(35.0 + top_share * 150.0 - diversity * 0.25);

    let avg_move_novelty =
        games.iter().map(|g| g.move_level_novelty).sum::<f64>() / games.len() as f64;
    let avg_move_staleness =
        games.iter().map(|g| g.move_level_staleness).sum::<f64>() / games.len() as f64;

    let novelty = clamp_0_100(avg_move_novelty * 0.10 + novelty_game * 0.90);
    let staleness = clamp_0_100(avg_move_staleness * 0.10 + staleness_game * 0.90);

    PlayerTraitScores {
        tactical,
        positional,
        aggressive,
        patient,
        novelty,
        staleness,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(tactical: f64, moves: usize, opening: &str) -> GameContribution {
        GameContribution {
            trait_scores: GameTraitScores {
                tactical,
                positional: 50.0,
                aggressive: 50.0,
                patient: 50.0,
                time_score: 50.0,
                total_moves: moves,
            },
            move_level_novelty: 50.0,
            move_level_staleness: 50.0,
            canonical_opening: Some(opening.to_string()),
        }
    }

    #[test]
    fn test_weighted_mean_favors_longer_games() {
        let games = vec![game(80.0, 10, "Italian Game"), game(20.0, 90, "Italian Game")];
        let scores = aggregate_player_traits(&games);
        assert!(scores.tactical < 50.0, "tactical={}", scores.tactical);
    }

    #[test]
    fn test_repeating_one_opening_raises_staleness_and_lowers_novelty() {
        let repetitive: Vec<GameContribution> =
            (0..10).map(|_| game(50.0, 30, "Italian Game")).collect();
        let diverse: Vec<GameContribution> = vec![
            game(50.0, 30, "Italian Game"),
            game(50.0, 30, "Sicilian Defense"),
            game(50.0, 30, "French Defense"),
            game(50.0, 30, "Caro-Kann Defense"),
        ];

        let repetitive_scores = aggregate_player_traits(&repetitive);
        let diverse_scores = aggregate_player_traits(&diverse);

        assert!(repetitive_scores.staleness > diverse_scores.staleness);
        assert!(repetitive_scores.novelty < diverse_scores.novelty);
    }

    #[test]
    fn test_empty_player_returns_neutral_scores() {
        let scores = aggregate_player_traits(&[]);
        assert_eq!(scores.tactical, 50.0);
    }
}
