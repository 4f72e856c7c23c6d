//! Authored level data and its resolution against a template library

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::Result;
use crate::core::Randomizer;
use crate::core::error::Error;
use crate::path::PathGenerator;
use crate::segment::SegmentTemplate;
use super::definition::SegmentDefinition;
use super::level::{Level, LevelContent};
use super::sequence::{SegmentSequence, SelectionPolicy};

/// Built-in selection policies; custom selectors are attached in code
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyDescriptor {
    #[default]
    Ordered,
    Random {
        #[serde(default)]
        prevent_repeat: bool,
    },
    Shuffled,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DefinitionDescriptor {
    /// Name looked up in the [`TemplateLibrary`]
    pub template: Option<String>,
    pub nested: Option<SequenceDescriptor>,
    pub random_pick_chance: f32,
    /// Pool capacity, when pooling is wanted
    pub pool: Option<usize>,
}

impl Default for DefinitionDescriptor {
    fn default() -> Self {
        Self {
            template: None,
            nested: None,
            random_pick_chance: 1.0,
            pool: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceDescriptor {
    pub name: String,
    pub enabled: bool,
    pub policy: PolicyDescriptor,
    pub spawn_count: usize,
    pub randomizer: Option<Randomizer>,
    pub path_generator: Option<PathGenerator>,
    pub definitions: Vec<DefinitionDescriptor>,
}

impl Default for SequenceDescriptor {
    fn default() -> Self {
        Self {
            name: String::new(),
            enabled: true,
            policy: PolicyDescriptor::Ordered,
            spawn_count: 1,
            randomizer: None,
            path_generator: None,
            definitions: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelDescriptor {
    pub name: String,
    pub enabled: bool,
    pub path_generator: Option<PathGenerator>,
    pub sequences: Vec<SequenceDescriptor>,
    /// Source name for levels whose sequences are loaded later
    pub remote: Option<String>,
}

impl Default for LevelDescriptor {
    fn default() -> Self {
        Self {
            name: String::new(),
            enabled: true,
            path_generator: None,
            sequences: Vec::new(),
            remote: None,
        }
    }
}

impl LevelDescriptor {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Named templates that descriptors refer to
#[derive(Clone, Debug, Default)]
pub struct TemplateLibrary {
    templates: HashMap<String, Arc<SegmentTemplate>>,
}

impl TemplateLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, template: SegmentTemplate) -> Arc<SegmentTemplate> {
        let template = Arc::new(template);
        self.templates.insert(template.name.clone(), template.clone());
        template
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn get(&self, name: &str) -> Result<Arc<SegmentTemplate>> {
        self.templates.get(name).cloned().ok_or_else(|| {
            log::error!("Template '{}' is not in the library", name);
            Error::Template(format!("unknown template '{}'", name))
        })
    }

    /// Read every `*.json` template in `dir`
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut library = Self::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                let contents = std::fs::read_to_string(&path)?;
                let template: SegmentTemplate = serde_json::from_str(&contents)?;
                log::debug!("Loaded template {} from {:?}", template.name, path);
                library.insert(template);
            }
        }
        Ok(library)
    }

    pub fn resolve_definition(&self, descriptor: &DefinitionDescriptor) -> Result<SegmentDefinition> {
        let mut definition = match (&descriptor.template, &descriptor.nested) {
            (_, Some(nested)) => SegmentDefinition::nested(self.resolve_sequence(nested)?),
            (Some(name), None) => SegmentDefinition::new(self.get(name)?),
            (None, None) => {
                log::error!("Definition names neither a template nor a nested sequence");
                return Err(Error::Template("empty definition".into()));
            }
        };
        definition.random_pick_chance = descriptor.random_pick_chance;
        if let Some(capacity) = descriptor.pool {
            definition = definition.with_pool(capacity);
        }
        Ok(definition)
    }

    pub fn resolve_sequence(&self, descriptor: &SequenceDescriptor) -> Result<SegmentSequence> {
        let policy = match descriptor.policy {
            PolicyDescriptor::Ordered => SelectionPolicy::Ordered,
            PolicyDescriptor::Random { prevent_repeat } => SelectionPolicy::Random { prevent_repeat },
            PolicyDescriptor::Shuffled => SelectionPolicy::Shuffled,
        };
        let definitions = descriptor
            .definitions
            .iter()
            .map(|d| self.resolve_definition(d))
            .collect::<Result<Vec<_>>>()?;
        let mut sequence = SegmentSequence::new(descriptor.name.clone(), policy).with_definitions(definitions);
        sequence.enabled = descriptor.enabled;
        sequence.spawn_count = descriptor.spawn_count;
        sequence.randomizer = descriptor.randomizer.clone();
        sequence.path_generator = descriptor.path_generator.clone();
        Ok(sequence)
    }

    /// Sequences and generator of a loaded remote level
    pub fn resolve_content(&self, descriptor: &LevelDescriptor) -> Result<LevelContent> {
        let sequences = descriptor
            .sequences
            .iter()
            .map(|s| self.resolve_sequence(s))
            .collect::<Result<Vec<_>>>()?;
        Ok(LevelContent {
            sequences,
            path_generator: descriptor.path_generator.clone(),
        })
    }

    pub fn resolve_level(&self, descriptor: &LevelDescriptor) -> Result<Level> {
        let mut level = match &descriptor.remote {
            Some(source) => Level::remote(descriptor.name.clone(), source.clone()),
            None => Level::new(descriptor.name.clone(), Vec::new()),
        };
        level.enabled = descriptor.enabled;
        if descriptor.remote.is_none() {
            let content = self.resolve_content(descriptor)?;
            level.sequences = content.sequences;
            level.path_generator = content.path_generator;
        } else {
            level.path_generator = descriptor.path_generator.clone();
        }
        Ok(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use crate::core::RandomizerConfig;

    fn library() -> TemplateLibrary {
        let mut library = TemplateLibrary::new();
        library.insert(SegmentTemplate::straight("road", 4.0, 20.0));
        library.insert(SegmentTemplate::straight("bridge", 4.0, 30.0));
        library
    }

    const LEVEL: &str = r#"{
        "name": "meadow",
        "sequences": [
            {
                "name": "intro",
                "definitions": [{ "template": "road" }, { "template": "bridge", "pool": 2 }]
            },
            {
                "name": "endless",
                "policy": { "Random": { "prevent_repeat": true } },
                "spawn_count": 0,
                "randomizer": { "Seeded": 4 },
                "definitions": [
                    { "template": "road", "random_pick_chance": 2.0 },
                    { "nested": { "name": "inner", "definitions": [{ "template": "bridge" }] } }
                ]
            }
        ]
    }"#;

    #[test]
    fn test_resolve_level_descriptor() {
        let descriptor = LevelDescriptor::from_json(LEVEL).unwrap();
        let level = library().resolve_level(&descriptor).unwrap();
        assert_eq!(level.name, "meadow");
        assert_eq!(level.sequences.len(), 2);
        assert!(level.sequences[0].definitions[1].pool.is_some());
        let endless = &level.sequences[1];
        assert_eq!(endless.spawn_count, 0);
        assert_eq!(endless.randomizer.as_ref().map(|r| r.config()), Some(RandomizerConfig::Seeded(4)));
        assert_eq!(endless.definitions[0].random_pick_chance, 2.0);
        assert!(endless.definitions[1].is_nested());
    }

    #[test]
    fn test_unknown_template_is_an_error() {
        let descriptor = LevelDescriptor::from_json(
            r#"{ "name": "x", "sequences": [{ "definitions": [{ "template": "missing" }] }] }"#,
        )
        .unwrap();
        assert!(matches!(library().resolve_level(&descriptor), Err(Error::Template(_))));
    }

    #[test]
    fn test_remote_level_defers_sequences() {
        let descriptor = LevelDescriptor::from_json(r#"{ "name": "far", "remote": "far_level" }"#).unwrap();
        let level = library().resolve_level(&descriptor).unwrap();
        assert!(level.is_remote());
        assert!(!level.is_ready());
    }

    #[test]
    fn test_load_descriptor_and_templates_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let template = serde_json::to_string(&SegmentTemplate::straight("ramp", 2.0, 8.0)).unwrap();
        std::fs::write(dir.path().join("ramp.json"), template).unwrap();
        let mut file = std::fs::File::create(dir.path().join("level.txt")).unwrap();
        file.write_all(br#"{ "name": "disk" }"#).unwrap();

        let library = TemplateLibrary::load_dir(dir.path()).unwrap();
        assert_eq!(library.len(), 1);
        assert!(library.get("ramp").is_ok());
        let level = LevelDescriptor::load(&dir.path().join("level.txt")).unwrap();
        assert_eq!(level.name, "disk");
    }
}
