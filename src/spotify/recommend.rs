//! Emotion to music mapping.
//!
//! Everything here is pure: profiles per emotion, audio-feature filters,
//! per-artist diversification and the summary of the chosen tracks. The
//! network side lives in [`crate::management::music`].

use std::collections::HashMap;

use rand::{Rng, seq::SliceRandom};

use crate::{
    types::{AudioFeatures, AudioSummary, Emotion, MusicParams, SpotifyTrack, Track},
    utils::round2,
};

/// Default maximum number of tracks per primary artist.
pub const MAX_PER_ARTIST: usize = 2;

/// Valid range for the `limit` of a recommendation request.
pub const LIMIT_RANGE: std::ops::RangeInclusive<usize> = 1..=50;

const DEFAULT_DESCRIPTION: &str = "Personalized music for your mood, curated by Ánima.";

/// Bounds on Spotify audio features. `None` means unconstrained.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureFilters {
    pub min_valence: Option<f64>,
    pub max_valence: Option<f64>,
    pub min_energy: Option<f64>,
    pub max_energy: Option<f64>,
    pub min_danceability: Option<f64>,
    pub max_danceability: Option<f64>,
    pub min_acousticness: Option<f64>,
    pub max_acousticness: Option<f64>,
    pub tempo_range: Option<(f64, f64)>,
    pub max_tempo: Option<f64>,
}

fn at_least(value: Option<f64>, bound: Option<f64>) -> bool {
    match (value, bound) {
        (Some(v), Some(b)) => v >= b,
        _ => true,
    }
}

fn at_most(value: Option<f64>, bound: Option<f64>) -> bool {
    match (value, bound) {
        (Some(v), Some(b)) => v <= b,
        _ => true,
    }
}

impl FeatureFilters {
    pub fn is_empty(&self) -> bool {
        *self == FeatureFilters::default()
    }

    /// Every configured bound must hold. A feature Spotify did not report
    /// never fails a bound.
    pub fn passes(&self, f: &AudioFeatures) -> bool {
        let tempo_ok = match (f.tempo, self.tempo_range) {
            (Some(t), Some((lo, hi))) => t >= lo && t <= hi,
            _ => true,
        };

        at_least(f.valence, self.min_valence)
            && at_most(f.valence, self.max_valence)
            && at_least(f.energy, self.min_energy)
            && at_most(f.energy, self.max_energy)
            && at_least(f.danceability, self.min_danceability)
            && at_most(f.danceability, self.max_danceability)
            && at_least(f.acousticness, self.min_acousticness)
            && at_most(f.acousticness, self.max_acousticness)
            && tempo_ok
            && at_most(f.tempo, self.max_tempo)
    }
}

/// How an emotion translates into Spotify queries and feature bounds.
#[derive(Debug, Clone)]
pub struct MusicProfile {
    pub emotion: Emotion,
    pub genres: &'static [&'static str],
    pub playlist_keywords: &'static [&'static str],
    pub filters: FeatureFilters,
    pub params: MusicParams,
    pub description: &'static str,
}

fn params(valence: &str, energy: &str, tempo: &str, mode: &str) -> MusicParams {
    MusicParams {
        valence: valence.to_string(),
        energy: energy.to_string(),
        tempo: tempo.to_string(),
        mode: mode.to_string(),
    }
}

pub fn profile(emotion: Emotion) -> MusicProfile {
    match emotion {
        Emotion::Happy => MusicProfile {
            emotion,
            genres: &["pop", "dance", "funk", "disco"],
            playlist_keywords: &["happy hits", "feel good"],
            filters: FeatureFilters {
                min_valence: Some(0.6),
                min_energy: Some(0.5),
                min_danceability: Some(0.5),
                ..Default::default()
            },
            params: params("high", "medium-high", "100-140 BPM", "major"),
            description: "Upbeat, cheerful tracks to keep your good mood going.",
        },
        Emotion::Sad => MusicProfile {
            emotion,
            genres: &["acoustic", "indie", "singer-songwriter", "piano"],
            playlist_keywords: &["sad songs", "melancholy"],
            filters: FeatureFilters {
                max_valence: Some(0.4),
                max_energy: Some(0.5),
                min_acousticness: Some(0.3),
                max_tempo: Some(110.0),
                ..Default::default()
            },
            params: params("low", "low", "60-110 BPM", "minor"),
            description: "Gentle, melancholic songs that keep you company when you feel down.",
        },
        Emotion::Angry => MusicProfile {
            emotion,
            genres: &["rock", "metal", "punk", "hard-rock"],
            playlist_keywords: &["rock hard", "adrenaline"],
            filters: FeatureFilters {
                max_valence: Some(0.5),
                min_energy: Some(0.7),
                tempo_range: Some((110.0, 200.0)),
                ..Default::default()
            },
            params: params("low-medium", "very high", "110-200 BPM", "minor"),
            description: "Intense, high-energy tracks to let the steam out.",
        },
        Emotion::Calm => MusicProfile {
            emotion,
            genres: &["ambient", "chill", "classical", "jazz"],
            playlist_keywords: &["chill vibes", "relax"],
            filters: FeatureFilters {
                max_energy: Some(0.5),
                min_acousticness: Some(0.4),
                max_tempo: Some(110.0),
                ..Default::default()
            },
            params: params("medium", "low", "60-110 BPM", "major"),
            description: "Relaxed, soothing music to match your calm.",
        },
        Emotion::Surprised => MusicProfile {
            emotion,
            genres: &["electronic", "edm", "house", "indie-pop"],
            playlist_keywords: &["new music friday", "energy boost"],
            filters: FeatureFilters {
                min_valence: Some(0.5),
                min_energy: Some(0.6),
                min_danceability: Some(0.5),
                ..Default::default()
            },
            params: params("medium-high", "high", "110-150 BPM", "major"),
            description: "Vibrant, unexpected tracks for a surprising moment.",
        },
        Emotion::Fear => MusicProfile {
            emotion,
            genres: &["ambient", "soundtrack", "classical", "post-rock"],
            playlist_keywords: &["dark ambient", "cinematic"],
            filters: FeatureFilters {
                max_valence: Some(0.4),
                max_energy: Some(0.6),
                tempo_range: Some((60.0, 120.0)),
                ..Default::default()
            },
            params: params("low", "medium", "60-120 BPM", "minor"),
            description: "Atmospheric, cinematic music that holds the tension.",
        },
        Emotion::Disgusted => MusicProfile {
            emotion,
            genres: &["grunge", "punk", "industrial", "alternative"],
            playlist_keywords: &["grunge", "alternative rock"],
            filters: FeatureFilters {
                max_valence: Some(0.5),
                min_energy: Some(0.6),
                ..Default::default()
            },
            params: params("low-medium", "high", "100-160 BPM", "minor"),
            description: "Raw, edgy tracks for when something just does not sit right.",
        },
        Emotion::Confused => MusicProfile {
            emotion,
            genres: &["lo-fi", "indie", "alternative", "trip-hop"],
            playlist_keywords: &["lofi beats", "focus"],
            filters: FeatureFilters {
                min_valence: Some(0.3),
                max_valence: Some(0.7),
                max_energy: Some(0.7),
                ..Default::default()
            },
            params: params("medium", "medium", "70-120 BPM", "mixed"),
            description: "Mellow, thoughtful music to help you sort things out.",
        },
    }
}

/// Maps a Rekognition label to an emotion; `UNKNOWN` and unmapped labels
/// become [`Emotion::Calm`].
pub fn emotion_for_label(label: &str) -> Emotion {
    label.parse().unwrap_or(Emotion::Calm)
}

/// Playlist description for an emotion label, with a generic fallback.
pub fn describe(label: &str) -> String {
    match label.parse::<Emotion>() {
        Ok(emotion) => profile(emotion).description.to_string(),
        Err(_) => DEFAULT_DESCRIPTION.to_string(),
    }
}

/// Reduces a Spotify track to the response shape. Tracks without an id
/// (local files, unavailable items) are dropped.
pub fn process_track(track: SpotifyTrack) -> Option<Track> {
    let id = track.id?;
    let (album, album_image) = match track.album {
        Some(album) => {
            let image = album.images.into_iter().next().map(|i| i.url);
            (album.name, image)
        }
        None => (String::new(), None),
    };

    Some(Track {
        id,
        name: track.name,
        artists: track.artists.into_iter().map(|a| a.name).collect(),
        album,
        album_image,
        preview_url: track.preview_url,
        external_url: track.external_urls.spotify,
        duration_ms: track.duration_ms,
        popularity: track.popularity,
    })
}

/// Removes repeated track ids keeping the first occurrence.
pub fn dedup_tracks(tracks: Vec<Track>) -> Vec<Track> {
    let mut seen = std::collections::HashSet::new();
    tracks
        .into_iter()
        .filter(|t| seen.insert(t.id.clone()))
        .collect()
}

/// Keeps tracks whose features pass `filters`. Tracks without features are
/// dropped.
pub fn filter_by_features(
    tracks: &[Track],
    features: &HashMap<String, AudioFeatures>,
    filters: &FeatureFilters,
) -> Vec<Track> {
    tracks
        .iter()
        .filter(|t| features.get(&t.id).is_some_and(|f| filters.passes(f)))
        .cloned()
        .collect()
}

/// Selects up to `limit` tracks round-robin across primary artists in
/// shuffled order, taking each artist's most popular tracks first.
///
/// The first pass allows at most `max_per_artist` tracks per artist. When
/// that leaves the selection short of `limit`, the remaining slots are filled
/// round-robin from each artist's leftovers, so the result has exactly
/// `limit` tracks whenever the pool holds that many.
pub fn diversify(tracks: Vec<Track>, limit: usize, max_per_artist: usize) -> Vec<Track> {
    diversify_with_rng(tracks, limit, max_per_artist, &mut rand::rng())
}

pub fn diversify_with_rng<R: Rng + ?Sized>(
    tracks: Vec<Track>,
    limit: usize,
    max_per_artist: usize,
    rng: &mut R,
) -> Vec<Track> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<Track>> = HashMap::new();
    for track in tracks {
        let artist = track.primary_artist().to_string();
        if !groups.contains_key(&artist) {
            order.push(artist.clone());
        }
        groups.entry(artist).or_default().push(track);
    }

    order.shuffle(rng);

    let mut queues: Vec<std::vec::IntoIter<Track>> = order
        .iter()
        .filter_map(|artist| groups.remove(artist))
        .map(|mut group| {
            group.sort_by(|a, b| b.popularity.cmp(&a.popularity));
            group.into_iter()
        })
        .collect();

    let mut selected = Vec::with_capacity(limit);
    take_rounds(&mut queues, &mut selected, limit, max_per_artist);
    take_rounds(&mut queues, &mut selected, limit, usize::MAX);
    selected
}

/// Takes at most one track per queue per round until `limit` is reached,
/// `rounds` are done or every queue is empty.
fn take_rounds(
    queues: &mut [std::vec::IntoIter<Track>],
    selected: &mut Vec<Track>,
    limit: usize,
    rounds: usize,
) {
    for _ in 0..rounds {
        let before = selected.len();
        for queue in queues.iter_mut() {
            if selected.len() >= limit {
                return;
            }
            if let Some(track) = queue.next() {
                selected.push(track);
            }
        }
        if selected.len() == before {
            return;
        }
    }
}

/// Averages the audio features of the selected tracks.
///
/// `mode` is `Major` when the mean mode is above 0.6, `Minor` below 0.4 and
/// `Mixed` otherwise; `N/A` when no features are known.
pub fn summarize(tracks: &[Track], features: Option<&HashMap<String, AudioFeatures>>) -> AudioSummary {
    let known: Vec<&AudioFeatures> = match features {
        Some(map) => tracks.iter().filter_map(|t| map.get(&t.id)).collect(),
        None => Vec::new(),
    };

    fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
        let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
        (n > 0).then(|| sum / n as f64)
    }

    let mode = match mean(known.iter().filter_map(|f| f.mode).map(f64::from)) {
        Some(m) if m > 0.6 => "Major",
        Some(m) if m < 0.4 => "Minor",
        Some(_) => "Mixed",
        None => "N/A",
    };

    AudioSummary {
        avg_valence: mean(known.iter().filter_map(|f| f.valence)).map(round2),
        avg_energy: mean(known.iter().filter_map(|f| f.energy)).map(round2),
        avg_tempo: mean(known.iter().filter_map(|f| f.tempo)).map(round2),
        mode: mode.to_string(),
        analyzed_tracks: known.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExternalUrls, SimpleArtist, SpotifyAlbum, SpotifyImage};
    use rand::{SeedableRng, rngs::StdRng};

    fn track(id: &str, artist: &str, popularity: u32) -> Track {
        Track {
            id: id.to_string(),
            name: format!("Track {id}"),
            artists: vec![artist.to_string()],
            album: "Album".to_string(),
            album_image: None,
            preview_url: None,
            external_url: None,
            duration_ms: 180_000,
            popularity,
        }
    }

    fn features(id: &str, valence: f64, energy: f64, tempo: f64, mode: i32) -> AudioFeatures {
        AudioFeatures {
            id: id.to_string(),
            valence: Some(valence),
            energy: Some(energy),
            danceability: Some(0.5),
            acousticness: Some(0.1),
            tempo: Some(tempo),
            mode: Some(mode),
        }
    }

    fn artist_counts(tracks: &[Track]) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for t in tracks {
            *counts.entry(t.primary_artist().to_string()).or_insert(0) += 1;
        }
        counts
    }

    #[test]
    fn test_passes_filters_basic() {
        let f = AudioFeatures {
            id: "a".to_string(),
            valence: Some(0.7),
            energy: Some(0.7),
            tempo: Some(100.0),
            ..Default::default()
        };
        let filters = FeatureFilters {
            min_valence: Some(0.5),
            min_energy: Some(0.5),
            tempo_range: Some((80.0, 140.0)),
            ..Default::default()
        };
        assert!(filters.passes(&f));

        let bad = AudioFeatures {
            id: "b".to_string(),
            valence: Some(0.2),
            energy: Some(0.1),
            tempo: Some(50.0),
            ..Default::default()
        };
        assert!(!filters.passes(&bad));
    }

    #[test]
    fn test_each_bound_rejects() {
        let base = AudioFeatures {
            id: "x".to_string(),
            ..Default::default()
        };
        let cases: Vec<(AudioFeatures, FeatureFilters)> = vec![
            (
                AudioFeatures { valence: Some(0.1), ..base.clone() },
                FeatureFilters { min_valence: Some(0.5), ..Default::default() },
            ),
            (
                AudioFeatures { valence: Some(0.9), ..base.clone() },
                FeatureFilters { max_valence: Some(0.5), ..Default::default() },
            ),
            (
                AudioFeatures { energy: Some(0.1), ..base.clone() },
                FeatureFilters { min_energy: Some(0.5), ..Default::default() },
            ),
            (
                AudioFeatures { energy: Some(0.9), ..base.clone() },
                FeatureFilters { max_energy: Some(0.5), ..Default::default() },
            ),
            (
                AudioFeatures { danceability: Some(0.1), ..base.clone() },
                FeatureFilters { min_danceability: Some(0.5), ..Default::default() },
            ),
            (
                AudioFeatures { acousticness: Some(0.9), ..base.clone() },
                FeatureFilters { max_acousticness: Some(0.5), ..Default::default() },
            ),
            (
                AudioFeatures { acousticness: Some(0.1), ..base.clone() },
                FeatureFilters { min_acousticness: Some(0.5), ..Default::default() },
            ),
            (
                AudioFeatures { tempo: Some(30.0), ..base.clone() },
                FeatureFilters { tempo_range: Some((60.0, 100.0)), ..Default::default() },
            ),
            (
                AudioFeatures { tempo: Some(200.0), ..base.clone() },
                FeatureFilters { max_tempo: Some(150.0), ..Default::default() },
            ),
        ];
        for (f, filters) in cases {
            assert!(!filters.passes(&f), "{:?} should fail {:?}", f, filters);
        }
    }

    #[test]
    fn test_empty_filters_and_missing_values_pass() {
        let full = features("a", 0.5, 0.5, 120.0, 1);
        assert!(FeatureFilters::default().passes(&full));
        assert!(FeatureFilters::default().is_empty());

        let sparse = AudioFeatures {
            id: "b".to_string(),
            ..Default::default()
        };
        assert!(profile(Emotion::Sad).filters.passes(&sparse));
    }

    #[test]
    fn test_every_emotion_has_a_profile() {
        for emotion in Emotion::ALL {
            let p = profile(emotion);
            assert_eq!(p.emotion, emotion);
            assert!(!p.genres.is_empty());
            assert!(!p.playlist_keywords.is_empty());
            assert!(!p.filters.is_empty());
            assert!(!p.description.is_empty());
        }
    }

    #[test]
    fn test_emotion_for_label() {
        assert_eq!(emotion_for_label("HAPPY"), Emotion::Happy);
        assert_eq!(emotion_for_label("UNKNOWN"), Emotion::Calm);
        assert_eq!(emotion_for_label(""), Emotion::Calm);
    }

    #[test]
    fn test_describe_with_default() {
        assert!(describe("HAPPY").contains("cheerful"));
        assert_eq!(describe("UNKNOWN_EMO"), DEFAULT_DESCRIPTION);
    }

    #[test]
    fn test_process_track() {
        let raw = SpotifyTrack {
            id: Some("t0".to_string()),
            name: "Track 0".to_string(),
            artists: vec![
                SimpleArtist { id: Some("a1".to_string()), name: "One".to_string() },
                SimpleArtist { id: None, name: "Two".to_string() },
            ],
            album: Some(SpotifyAlbum {
                name: "Album".to_string(),
                images: vec![
                    SpotifyImage { url: "https://img/large".to_string(), height: Some(640), width: Some(640) },
                    SpotifyImage { url: "https://img/small".to_string(), height: Some(64), width: Some(64) },
                ],
            }),
            preview_url: None,
            external_urls: ExternalUrls { spotify: Some("https://open.spotify.com/track/t0".to_string()) },
            duration_ms: 1000,
            popularity: 42,
        };
        let t = process_track(raw).unwrap();
        assert_eq!(t.id, "t0");
        assert_eq!(t.name, "Track 0");
        assert_eq!(t.artists, vec!["One", "Two"]);
        assert_eq!(t.album_image.as_deref(), Some("https://img/large"));
        assert_eq!(t.external_url.as_deref(), Some("https://open.spotify.com/track/t0"));
        assert_eq!(t.popularity, 42);
    }

    #[test]
    fn test_process_track_without_id() {
        let raw: SpotifyTrack = serde_json::from_value(serde_json::json!({"name": "local"})).unwrap();
        assert!(process_track(raw).is_none());
    }

    #[test]
    fn test_dedup_tracks() {
        let out = dedup_tracks(vec![track("a", "x", 1), track("b", "x", 2), track("a", "y", 3)]);
        let ids: Vec<_> = out.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_diversify_exact_limit_and_cap() {
        // 10 artists x 3 tracks
        let mut tracks = Vec::new();
        for i in 0..10 {
            for j in 0..3 {
                tracks.push(track(&format!("{i}-{j}"), &format!("Artist{i}"), (i * 3 + j) as u32));
            }
        }
        let out = diversify(tracks, 10, MAX_PER_ARTIST);
        assert_eq!(out.len(), 10);
        assert!(artist_counts(&out).values().all(|&c| c <= MAX_PER_ARTIST));
    }

    #[test]
    fn test_diversify_few_artists_fills_limit() {
        // 30 tracks over 3 artists, limit 10: the cap yields 6, leftovers fill the rest
        let tracks: Vec<Track> = (0..30)
            .map(|i| track(&format!("t{i}"), &format!("Artist{}", i % 3), i))
            .collect();
        let out = diversify(tracks.clone(), 10, MAX_PER_ARTIST);
        assert_eq!(out.len(), 10);
        let counts = artist_counts(&out);
        assert!(counts.len() >= 2);
        assert!(counts.values().all(|&c| c <= 10usize.div_ceil(3)));

        // Within the capped pool the cap still holds
        let out = diversify(tracks, 5, MAX_PER_ARTIST);
        assert_eq!(out.len(), 5);
        assert!(artist_counts(&out).values().all(|&c| c <= MAX_PER_ARTIST));
    }

    #[test]
    fn test_diversify_prefers_popular_tracks() {
        let tracks = vec![
            track("low", "Solo", 10),
            track("high", "Solo", 90),
            track("mid", "Solo", 50),
        ];
        let mut rng = StdRng::seed_from_u64(7);
        let out = diversify_with_rng(tracks.clone(), 2, MAX_PER_ARTIST, &mut rng);
        let ids: Vec<_> = out.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "mid"]);

        // A lone artist still fills the limit from its leftovers
        let out = diversify_with_rng(tracks, 5, MAX_PER_ARTIST, &mut rng);
        let ids: Vec<_> = out.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "mid", "low"]);
    }

    #[test]
    fn test_diversify_round_robin_spreads_artists() {
        // 20 tracks over 5 artists, limit 8: first round covers every artist
        let tracks: Vec<Track> = (0..20)
            .map(|i| track(&format!("t{i}"), &format!("Artist{}", i % 5), i * 3))
            .collect();
        let out = diversify(tracks, 8, MAX_PER_ARTIST);
        assert_eq!(out.len(), 8);
        assert_eq!(artist_counts(&out).len(), 5);
    }

    #[test]
    fn test_diversify_empty() {
        assert!(diversify(Vec::new(), 10, MAX_PER_ARTIST).is_empty());
    }

    #[test]
    fn test_filter_by_features_drops_unknown() {
        let tracks = vec![track("a", "x", 1), track("b", "y", 1), track("c", "z", 1)];
        let mut map = HashMap::new();
        map.insert("a".to_string(), features("a", 0.9, 0.8, 120.0, 1));
        map.insert("b".to_string(), features("b", 0.1, 0.2, 40.0, 0));
        let filters = FeatureFilters {
            min_valence: Some(0.5),
            ..Default::default()
        };
        let out = filter_by_features(&tracks, &map, &filters);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "a");
    }

    #[test]
    fn test_summarize_modes() {
        let tracks = vec![track("a", "x", 1), track("b", "y", 1)];

        let none = summarize(&tracks, None);
        assert_eq!(none.mode, "N/A");
        assert_eq!(none.avg_valence, None);
        assert_eq!(none.analyzed_tracks, 0);

        let mut major = HashMap::new();
        major.insert("a".to_string(), features("a", 0.8, 0.8, 130.0, 1));
        major.insert("b".to_string(), features("b", 0.7, 0.7, 110.0, 1));
        let s = summarize(&tracks, Some(&major));
        assert_eq!(s.mode, "Major");
        assert_eq!(s.avg_valence, Some(0.75));
        assert_eq!(s.avg_tempo, Some(120.0));
        assert_eq!(s.analyzed_tracks, 2);

        let mut minor = HashMap::new();
        minor.insert("a".to_string(), features("a", 0.2, 0.2, 100.0, 0));
        minor.insert("b".to_string(), features("b", 0.3, 0.3, 90.0, 0));
        assert_eq!(summarize(&tracks, Some(&minor)).mode, "Minor");

        let mut mixed = HashMap::new();
        mixed.insert("a".to_string(), features("a", 0.5, 0.5, 100.0, 1));
        mixed.insert("b".to_string(), features("b", 0.5, 0.5, 100.0, 0));
        assert_eq!(summarize(&tracks, Some(&mixed)).mode, "Mixed");
    }
}
