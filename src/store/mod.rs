//! Pose Store
//!
//! In-memory pose database keyed by pose id, with JSON file persistence and
//! three built-in poses for out-of-the-box sessions. The on-disk format is
//! a single JSON object mapping id to pose definition, so a pose file can
//! be edited by hand and reloaded.
//!
//! The store is caller-owned: the runtime builds one and passes it where
//! needed; nothing here is global.

use crate::types::{CheckKind, CheckSpec, MistakeRule, PoseDefinition, PoseStep, PoseStructure};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Pose persistence errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read pose file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write pose file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid pose file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize pose database: {0}")]
    Serialize(serde_json::Error),
}

// ============================================================================
// Store
// ============================================================================

/// Pose definitions keyed by id.
#[derive(Debug, Clone, Default)]
pub struct PoseStore {
    poses: BTreeMap<String, PoseDefinition>,
}

impl PoseStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-loaded with the built-in poses.
    pub fn with_builtins() -> Self {
        let mut store = Self::new();
        for pose in builtin_poses() {
            store.add(pose);
        }
        store
    }

    /// Add or replace a pose, keyed by its id.
    pub fn add(&mut self, pose: PoseDefinition) {
        info!(id = %pose.id, title = %pose.title, "Pose added/updated");
        self.poses.insert(pose.id.clone(), pose);
    }

    pub fn get(&self, id: &str) -> Option<&PoseDefinition> {
        self.poses.get(id)
    }

    /// Get a pose with its step ladder resolved: poses stored without steps
    /// (or with an empty list) get a ladder derived from their structure.
    pub fn get_with_steps(&self, id: &str) -> Option<PoseDefinition> {
        let mut pose = self.poses.get(id)?.clone();
        let needs_derivation = pose.steps.as_ref().map_or(true, Vec::is_empty);
        if needs_derivation {
            pose.steps = Some(crate::coach::derive_steps(&pose));
        }
        Some(pose)
    }

    pub fn list(&self) -> impl Iterator<Item = &PoseDefinition> {
        self.poses.values()
    }

    /// Remove a pose. Returns whether it existed.
    pub fn remove(&mut self, id: &str) -> bool {
        let removed = self.poses.remove(id).is_some();
        if removed {
            info!(id, "Pose deleted");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    /// Write the whole store to a JSON file (map of id to definition).
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.poses).map_err(StoreError::Serialize)?;
        std::fs::write(path, json).map_err(|source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), poses = self.poses.len(), "Pose database saved");
        Ok(())
    }

    /// Load a store from a JSON pose file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| StoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let poses: BTreeMap<String, PoseDefinition> =
            serde_json::from_str(&text).map_err(|source| StoreError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        info!(path = %path.display(), poses = poses.len(), "Pose database loaded");
        Ok(Self { poses })
    }

    /// Load a pose file, falling back to the built-in poses when the file
    /// does not exist. A file that exists but cannot be parsed is an error,
    /// not a fallback.
    pub fn load_or_builtin(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        match Self::load_from_file(path) {
            Ok(store) => Ok(store),
            Err(StoreError::Read { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                warn!(path = %path.display(), "Pose file not found, loading built-in poses");
                Ok(Self::with_builtins())
            }
            Err(err) => Err(err),
        }
    }
}

// ============================================================================
// Built-in poses
// ============================================================================

fn step(
    instruction: &str,
    check: CheckSpec,
    alts: &[&str],
    mistakes: &[(&str, &str)],
) -> PoseStep {
    PoseStep {
        instruction: instruction.to_string(),
        check,
        alt_explanations: alts.iter().map(|alt| (*alt).to_string()).collect(),
        common_mistakes: mistakes
            .iter()
            .map(|(detect, fix)| MistakeRule {
                detect: (*detect).to_string(),
                fix: (*fix).to_string(),
            })
            .collect(),
        auto_advance_seconds: None,
    }
}

fn shoulders_check() -> CheckSpec {
    CheckSpec {
        kind: CheckKind::ShouldersLevel,
        description: String::new(),
        threshold: Some(0.04),
    }
}

fn structure(head: &str, hands: &str, feet: &str) -> PoseStructure {
    PoseStructure {
        head: head.to_string(),
        hands: hands.to_string(),
        feet: feet.to_string(),
    }
}

/// The poses shipped with the crate. Instructions follow the
/// `[BODY PART] — [direction + action]` formula throughout.
pub fn builtin_poses() -> Vec<PoseDefinition> {
    vec![confident_stance(), relaxed_casual(), hands_on_hips()]
}

fn confident_stance() -> PoseDefinition {
    let mut pose = PoseDefinition::new("confident-stance", "Confident Power Stance");
    pose.description = "Front view, chest level".to_string();
    pose.structure = Some(structure(
        "Chin — lift it up slightly, eyes forward to camera",
        "Right hand — place it on your right hip, elbow pointing out",
        "Feet — spread them shoulder-width apart, weight even",
    ));
    pose.tips = vec![
        "Stand tall".to_string(),
        "Shoulders back".to_string(),
        "Slight smile".to_string(),
    ];
    pose.steps = Some(vec![
        step(
            "Feet — spread them apart to shoulder width, like standing on train tracks",
            CheckSpec::with_description(CheckKind::FeetPosition, "shoulder width apart spread"),
            &[
                "Feet — look down, they should be directly under your shoulders",
                "Feet — imagine a line from each shoulder dropping straight down to your feet",
                "Feet — step your left foot left and right foot right until hip-width",
            ],
            &[(
                "feet_too_close",
                "Feet — step them wider apart, about hip-width",
            )],
        ),
        step(
            "Shoulders — pull them down away from your ears, then back like squeezing a pencil between your shoulder blades",
            shoulders_check(),
            &[
                "Shoulders — exhale and drop them 2 inches down, roll them back",
                "Shoulders — imagine someone pushing down gently on top of each shoulder",
                "Shoulders — pretend you're wearing a heavy backpack — let them sink down and back",
            ],
            &[(
                "shoulders_hunched",
                "Shoulders — they're creeping up toward your ears, drop them down",
            )],
        ),
        step(
            "Right hand — bring it to your right hip bone, elbow pointing out to the side",
            CheckSpec::with_description(CheckKind::HandsPosition, "hand on hip waist"),
            &[
                "Right wrist — place it where your waist curves in, thumb forward, fingers on your lower back",
                "Right elbow — push it out to the side like you're making room in a crowd",
                "Right hand — find your hip bone with your fingers, rest your palm there",
            ],
            &[(
                "hand_too_high",
                "Right hand — slide it down to your hip, not your ribs",
            )],
        ),
        step(
            "Chin — lift it up slightly, like looking at the top of a doorframe, eyes straight at camera",
            CheckSpec::with_description(CheckKind::HeadPosition, "chin up elevated lift"),
            &[
                "Chin — imagine someone called your name from slightly above eye level",
                "Chin — push it forward and up, like a turtle coming out of its shell",
                "Face — look at a point 6 inches above the camera lens",
            ],
            &[(
                "chin_too_high",
                "Chin — lower it a bit, you're looking too far up at the ceiling",
            )],
        ),
    ]);
    pose
}

fn relaxed_casual() -> PoseDefinition {
    let mut pose = PoseDefinition::new("relaxed-casual", "Relaxed Casual");
    pose.description = "3/4 angle, natural light".to_string();
    pose.structure = Some(structure(
        "Head — tilt it slightly to your right, chin level",
        "Arms — let them hang down by your sides, fingers relaxed",
        "Left foot — step it forward slightly, weight on back foot",
    ));
    pose.tips = vec![
        "Stay loose".to_string(),
        "Natural smile".to_string(),
        "Weight on back foot".to_string(),
    ];
    pose.steps = Some(vec![
        step(
            "Left foot — step it forward about 6 inches, keep your weight on your back (right) foot",
            CheckSpec::with_description(CheckKind::FeetPosition, "one foot forward staggered step"),
            &[
                "Left foot — slide it forward like you're about to take a slow step but stopped mid-stride",
                "Right foot — keep it planted, shift your weight onto it, left foot just touches lightly",
                "Feet — imagine you're standing in a queue, one foot slightly ahead",
            ],
            &[],
        ),
        step(
            "Arms — shake them out, then let them drop completely by your sides, fingers loose",
            CheckSpec::with_description(CheckKind::HandsPosition, "relaxed down by sides"),
            &[
                "Arms — pretend they're made of heavy rope, let gravity pull them down",
                "Hands — curl your fingers slightly like you're holding invisible tennis balls",
                "Wrists — rotate them so palms face your thighs, completely relaxed",
            ],
            &[(
                "arms_stiff",
                "Arms — shake them out again, they look stiff, let them hang loose",
            )],
        ),
        step(
            "Head — tilt it slightly to your right, like you're curious about something",
            CheckSpec::with_description(CheckKind::HeadPosition, "slight tilt angle turn"),
            &[
                "Head — drop your right ear toward your right shoulder, just a little",
                "Chin — keep it level but rotate your head slightly right",
                "Face — turn it 10 degrees to your right, like looking at something just off-camera",
            ],
            &[],
        ),
    ]);
    pose
}

fn hands_on_hips() -> PoseDefinition {
    let mut pose = PoseDefinition::new("hands-on-hips", "Power Pose - Hands on Hips");
    pose.description = "Front facing, full body".to_string();
    pose.structure = Some(structure(
        "Chin — keep it level, eyes straight at camera",
        "Both hands — place them on your hips, elbows wide",
        "Feet — spread them wider than shoulder-width, grounded",
    ));
    pose.tips = vec![
        "Project confidence".to_string(),
        "Take up space".to_string(),
        "Strong eye contact".to_string(),
    ];
    pose.steps = Some(vec![
        step(
            "Feet — spread them wider than your shoulders, plant them firmly like a superhero",
            CheckSpec::with_description(CheckKind::FeetPosition, "wide apart spread"),
            &[
                "Feet — step each foot out another 6 inches, take up more space",
                "Feet — imagine you're standing on a wide balance beam, feet at each edge",
                "Legs — straighten them, feel grounded and powerful",
            ],
            &[],
        ),
        step(
            "Shoulders — exhale and drop them down, then roll them back so your chest opens up",
            shoulders_check(),
            &[
                "Shoulders — imagine a weight on each one pulling them down toward the floor",
                "Chest — push it forward slightly as your shoulders move back",
                "Shoulders — make them level, left and right the same height",
            ],
            &[(
                "shoulders_hunched",
                "Shoulders — they're tensed up, breathe out and let them fall",
            )],
        ),
        step(
            "Both hands — place them on your hip bones, thumbs forward, elbows pointing out wide to the sides",
            CheckSpec::with_description(CheckKind::HandsPosition, "both hands on hips waist"),
            &[
                "Elbows — push them out to the sides like you're making yourself wider",
                "Wrists — rest them where your waist meets your hips",
                "Hands — classic superhero pose, fingers wrap around to your lower back",
            ],
            &[],
        ),
        step(
            "Chin — keep it level, not up or down, eyes looking straight into the camera lens",
            CheckSpec::with_description(CheckKind::HeadPosition, "straight level forward"),
            &[
                "Face — look directly at the camera like you're looking at someone eye-to-eye",
                "Chin — imagine a level bubble sitting on it, keep it balanced",
                "Head — don't tilt it, face straight ahead at the lens",
            ],
            &[],
        ),
    ]);
    pose
}
