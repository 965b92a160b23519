use crate::wheel::{BOUNDARY_EPSILON, FULL_TURN};
use derive_more::{AsRef, Deref, Display, From, Into};
use nearby::Keyword;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, Deref, From, Into, AsRef,
)]
#[serde(transparent)]
pub struct CategoryName(String);

nearby::impl_string_newtype!(CategoryName);

#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, Deref, From, Into, AsRef,
)]
#[serde(transparent)]
pub struct Glyph(String);

nearby::impl_string_newtype!(Glyph);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: CategoryName,
    pub glyph: Glyph,
    pub keyword: Keyword,
}

impl Category {
    pub fn new(name: &str, glyph: &str, keyword: &str) -> Option<Self> {
        Some(Self {
            name: CategoryName::from(name),
            glyph: Glyph::from(glyph),
            keyword: Keyword::parse(keyword).ok()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WheelError {
    #[error("the wheel needs at least one category")]
    Empty,
}

/// Index of the segment under the pointer once the wheel has come to rest at `rotation`.
///
/// Segment `i` covers `[i * arc, (i + 1) * arc)` measured from the pointer against the
/// direction of rotation. Whole turns do not matter, and neither does the sign of `rotation`.
pub fn segment_index(rotation: f64, pointer_angle: f64, count: usize) -> usize {
    if count == 0 {
        return 0;
    }

    let effective = rotation.rem_euclid(FULL_TURN);
    let relative = (pointer_angle - effective).rem_euclid(FULL_TURN);
    let position = relative / (FULL_TURN / count as f64);

    // the modular reductions above leave boundary angles a few ulps off in either direction
    let snapped = position.round();
    let segment = if (position - snapped).abs() < BOUNDARY_EPSILON {
        snapped
    } else {
        position.floor()
    };

    segment as usize % count
}

pub fn resolve_category(
    rotation: f64,
    pointer_angle: f64,
    categories: &[Category],
) -> Option<&Category> {
    categories.get(segment_index(rotation, pointer_angle, categories.len()))
}

/// The fixed, ordered set of categories painted on the wheel.
#[derive(Debug, Clone, PartialEq)]
pub struct Wheel {
    categories: Vec<Category>,
    pointer_angle: f64,
}

impl Wheel {
    pub fn new(categories: Vec<Category>, pointer_angle: f64) -> Result<Self, WheelError> {
        if categories.is_empty() {
            return Err(WheelError::Empty);
        }
        Ok(Self {
            categories,
            pointer_angle,
        })
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn arc(&self) -> f64 {
        FULL_TURN / self.len() as f64
    }

    pub fn resolve(&self, rotation: f64) -> &Category {
        &self.categories[segment_index(rotation, self.pointer_angle, self.len())]
    }

    /// Final rotation of a spin of between `min_turns` and `max_turns` whole-or-partial turns.
    pub fn draw_rotation<R: Rng + ?Sized>(rng: &mut R, min_turns: f64, max_turns: f64) -> f64 {
        let turns = if max_turns > min_turns {
            rng.gen_range(min_turns..max_turns)
        } else {
            min_turns
        };
        turns * FULL_TURN
    }
}
