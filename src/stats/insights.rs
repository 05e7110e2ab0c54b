//! Narrative presentation glue over the dataset summary.
//!
//! Story insights and discovery journeys are short templated blurbs the
//! frontend renders verbatim; everything numeric comes from the aggregator.

use super::DatasetSummary;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct StoryInsight {
    pub title: String,
    pub body: String,
    pub metric: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct JourneyStep {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryJourney {
    pub seed: String,
    pub summary: String,
    pub steps: Vec<JourneyStep>,
}

fn capitalize(scope: &str) -> String {
    let mut chars = scope.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Build story-mode insights for a summary. `scope` reads like
/// "the catalog" or "your library". An empty dataset yields no insights.
pub fn build_story_insights(summary: &DatasetSummary, scope: &str) -> Vec<StoryInsight> {
    if summary.totals.total_rows == 0 {
        return Vec::new();
    }

    let mut insights = Vec::new();

    if let Some(top_genre) = summary.top_genres.first() {
        insights.push(StoryInsight {
            title: format!("Top {} wave", top_genre.name),
            body: format!(
                "{} leans heavily into this genre, keep it in rotation.",
                capitalize(scope)
            ),
            metric: format!("{} tracks", top_genre.count),
        });
    }

    if let (Some(energy), Some(danceability)) = (
        summary.totals.average_energy,
        summary.totals.average_danceability,
    ) {
        let tone = if energy >= danceability {
            "uptempo"
        } else {
            "laid-back"
        };
        insights.push(StoryInsight {
            title: "Energy vs danceability".to_string(),
            body: format!("{} skews toward {} mixes.", capitalize(scope), tone),
            metric: format!(
                "Energy {:.0}% / Dance {:.0}%",
                energy * 100.0,
                danceability * 100.0
            ),
        });
    }

    let range = summary.totals.release_year_range;
    if let (Some(min), Some(max)) = (range.min, range.max) {
        insights.push(StoryInsight {
            title: "Era coverage".to_string(),
            body: format!(
                "Repertoire spans {}-{}, enabling multi-decade storytelling.",
                min, max
            ),
            metric: format!("{}-{}", min, max),
        });
    }

    insights
}

/// Build discovery journeys seeded from the summary's top artists, pairing
/// each with a genre anchor from the same leaderboard position.
pub fn build_discovery_journeys(summary: &DatasetSummary, limit: usize) -> Vec<DiscoveryJourney> {
    let genres: Vec<&str> = summary
        .top_genres
        .iter()
        .map(|genre| genre.name.as_str())
        .collect();

    summary
        .top_artists
        .iter()
        .take(limit)
        .enumerate()
        .map(|(index, artist)| {
            let anchor_genre = genres
                .get(index)
                .or_else(|| genres.first())
                .copied()
                .unwrap_or("adjacent scenes");
            let steps = vec![
                JourneyStep {
                    title: "Start".to_string(),
                    description: format!("Spin {}'s essentials to ground the vibe.", artist.name),
                },
                JourneyStep {
                    title: "Nearby influence".to_string(),
                    description: format!("Blend other {} staples for cohesion.", anchor_genre),
                },
                JourneyStep {
                    title: "Stretch goal".to_string(),
                    description: "Jump to adjacent genres to keep exploration fresh.".to_string(),
                },
            ];
            DiscoveryJourney {
                seed: artist.name.clone(),
                summary: format!("{} to {} to discovery", artist.name, anchor_genre),
                steps,
            }
        })
        .collect()
}
