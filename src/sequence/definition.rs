//! Sequence entries: a template or a nested sequence, plus selection metadata

use std::fmt;
use std::sync::Arc;

use crate::core::Result;
use crate::core::error::Error;
use crate::segment::{Segment, SegmentPool, SegmentTemplate};
use super::sequence::SegmentSequence;

/// One entry of a [`SegmentSequence`]
pub struct SegmentDefinition {
    pub template: Option<Arc<SegmentTemplate>>,
    /// When set, picking this entry hands selection to the child sequence
    pub nested: Option<Box<SegmentSequence>>,
    /// Relative weight for weighted random selection
    pub random_pick_chance: f32,
    pub pool: Option<Arc<SegmentPool>>,
}

impl fmt::Debug for SegmentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentDefinition")
            .field("template", &self.template.as_ref().map(|t| t.name.as_str()))
            .field("nested", &self.nested.as_ref().map(|s| s.name.as_str()))
            .field("random_pick_chance", &self.random_pick_chance)
            .field("pooled", &self.pool.is_some())
            .finish()
    }
}

impl Default for SegmentDefinition {
    fn default() -> Self {
        Self {
            template: None,
            nested: None,
            random_pick_chance: 1.0,
            pool: None,
        }
    }
}

impl SegmentDefinition {
    pub fn new(template: Arc<SegmentTemplate>) -> Self {
        Self {
            template: Some(template),
            ..Default::default()
        }
    }

    pub fn nested(sequence: SegmentSequence) -> Self {
        Self {
            nested: Some(Box::new(sequence)),
            ..Default::default()
        }
    }

    pub fn with_chance(mut self, chance: f32) -> Self {
        self.random_pick_chance = chance;
        self
    }

    /// Keep up to `capacity` destroyed segments of this definition for reuse
    pub fn with_pool(mut self, capacity: usize) -> Self {
        self.pool = Some(Arc::new(SegmentPool::new(capacity)));
        self
    }

    pub fn is_nested(&self) -> bool {
        self.nested.is_some()
    }

    pub(crate) fn selection(&self) -> Selection {
        Selection {
            template: self.template.clone(),
            pool: self.pool.clone(),
        }
    }
}

/// What a sequence picked: enough to produce one segment
#[derive(Clone)]
pub struct Selection {
    pub template: Option<Arc<SegmentTemplate>>,
    pub pool: Option<Arc<SegmentPool>>,
}

impl fmt::Debug for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selection")
            .field("template", &self.template.as_ref().map(|t| t.name.as_str()))
            .field("pooled", &self.pool.is_some())
            .finish()
    }
}

impl Selection {
    pub fn name(&self) -> Option<&str> {
        self.template.as_ref().map(|t| t.name.as_str())
    }

    /// Produce a segment, reusing a pooled body when one is available
    pub fn instantiate(&self, index: u64, level: usize) -> Result<Segment> {
        let Some(template) = &self.template else {
            log::error!("Cannot instantiate segment {}: definition has no template", index);
            return Err(Error::Template("definition has no template".into()));
        };
        if let Some(pool) = &self.pool {
            if let Some(mut segment) = pool.take(&template.name) {
                log::trace!("Reusing pooled segment {} as {}", template.name, index);
                segment.recycle(index, level);
                segment.pool = Some(pool.clone());
                return Ok(segment);
            }
        }
        let mut segment = Segment::instantiate(index, level, template.clone());
        segment.pool = self.pool.clone();
        Ok(segment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Vec3;
    use crate::segment::Mesh;

    #[test]
    fn test_empty_definition_refuses() {
        let selection = SegmentDefinition::default().selection();
        assert!(matches!(selection.instantiate(0, 0), Err(Error::Template(_))));
    }

    #[test]
    fn test_pooled_segment_is_reused() {
        let template = Arc::new(SegmentTemplate::straight("road", 2.0, 10.0));
        let definition = SegmentDefinition::new(template).with_pool(2);
        let selection = definition.selection();

        let first = selection.instantiate(0, 0).unwrap();
        let pool = first.pool.clone().unwrap();
        assert!(pool.give(first));
        assert_eq!(pool.available(), 1);

        let reused = selection.instantiate(7, 1).unwrap();
        assert_eq!(pool.available(), 0);
        assert_eq!(reused.index, 7);
        assert_eq!(reused.level, 1);
        assert!(reused.pool.is_some());
    }

    #[test]
    fn test_recycled_segment_keeps_buffers() {
        let template = Arc::new(SegmentTemplate::straight("road", 2.0, 10.0));
        let selection = SegmentDefinition::new(template.clone()).with_pool(1).selection();

        let mut first = selection.instantiate(0, 0).unwrap();
        first.objects[0].mesh = Some(Mesh::strip(2.0, 10.0, 16));
        first.objects[0].transform.position = Vec3::new(40.0, 2.0, -3.0);
        first.mark_extruded();
        first.previous = Some(3);
        let capacity = first.objects[0].mesh.as_ref().unwrap().vertices.capacity();
        let pool = first.pool.clone().unwrap();
        assert!(pool.give(first));

        let reused = selection.instantiate(4, 2).unwrap();
        let mesh = reused.objects[0].mesh.as_ref().unwrap();
        assert_eq!(mesh.vertex_count(), 0);
        assert_eq!(mesh.vertices.capacity(), capacity);
        let source = &template.objects[reused.objects[0].source];
        assert_eq!(Some(reused.objects[0].transform), source.transform);
        assert!(!reused.is_extruded());
        assert_eq!(reused.previous, None);
        assert!(reused.path.is_empty());
    }

    #[test]
    fn test_parked_segments_do_not_keep_pool_alive() {
        let template = Arc::new(SegmentTemplate::straight("road", 2.0, 10.0));
        let definition = SegmentDefinition::new(template).with_pool(2);
        let selection = definition.selection();

        let segment = selection.instantiate(0, 0).unwrap();
        let pool = segment.pool.clone().unwrap();
        let weak = Arc::downgrade(&pool);
        assert!(pool.give(segment));
        assert_eq!(pool.available(), 1);

        drop(pool);
        drop(selection);
        drop(definition);
        assert!(weak.upgrade().is_none());
    }
}
