//! The data-driven crafting recipe table.
//!
//! Recipes are keyed by `(verb, sorted input bag, technique)`; lookup is
//! exact. For `apply` recipes the technique slot carries the tool's item
//! kind -- the tool is required but never consumed. A miss produces
//! partial-match hints derived from recipes sharing at least one input,
//! so failed experiments still teach something.

use std::collections::BTreeMap;

use hearth_types::{CraftVerb, ResourceKind};

/// What a recipe produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipeOutput {
    /// A stackable output.
    Stack {
        /// The resource produced.
        kind: ResourceKind,
        /// Units produced per craft.
        quantity: u32,
    },
    /// A unique item output.
    Item {
        /// The item kind produced.
        kind: String,
        /// Properties stamped onto the crafted item.
        properties: BTreeMap<String, serde_json::Value>,
    },
}

impl RecipeOutput {
    /// The output's kind label.
    pub fn label(&self) -> String {
        match self {
            Self::Stack { kind, .. } => kind.as_str().to_owned(),
            Self::Item { kind, .. } => kind.clone(),
        }
    }

    /// Units produced (1 for unique items).
    pub const fn quantity(&self) -> u32 {
        match self {
            Self::Stack { quantity, .. } => *quantity,
            Self::Item { .. } => 1,
        }
    }
}

/// A single crafting recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    /// The crafting verb this recipe answers to.
    pub verb: CraftVerb,
    /// Input bag, kept sorted. Consumed on success (the `apply` tool is
    /// not an input -- it sits in `technique`).
    pub inputs: Vec<ResourceKind>,
    /// `work`: the technique name. `apply`: the tool's item kind.
    /// `combine`: none.
    pub technique: Option<String>,
    /// What the recipe produces.
    pub output: RecipeOutput,
    /// Hints surfaced to the crafter on success, nudging further
    /// experiments.
    pub discoveries: Vec<String>,
}

impl Recipe {
    fn matches(&self, verb: CraftVerb, inputs: &[ResourceKind], technique: Option<&str>) -> bool {
        self.verb == verb
            && self.inputs == inputs
            && self.technique.as_deref() == technique
    }
}

/// The recipe table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeBook {
    recipes: Vec<Recipe>,
}

impl RecipeBook {
    /// Build a book from explicit recipes (inputs are sorted on entry).
    pub fn from_recipes(mut recipes: Vec<Recipe>) -> Self {
        for recipe in &mut recipes {
            recipe.inputs.sort_unstable();
        }
        Self { recipes }
    }

    /// Exact lookup on `(verb, sorted inputs, technique)`.
    pub fn lookup(
        &self,
        verb: CraftVerb,
        inputs: &[ResourceKind],
        technique: Option<&str>,
    ) -> Option<&Recipe> {
        let mut sorted = inputs.to_vec();
        sorted.sort_unstable();
        self.recipes
            .iter()
            .find(|recipe| recipe.matches(verb, &sorted, technique))
    }

    /// Hints for a failed attempt: one line per recipe sharing at least
    /// one input with the attempt, naming the shared input without giving
    /// the full recipe away.
    pub fn hints(&self, inputs: &[ResourceKind]) -> Vec<String> {
        let mut hints = Vec::new();
        for recipe in &self.recipes {
            let Some(shared) = recipe.inputs.iter().find(|input| inputs.contains(input)) else {
                continue;
            };
            let verb = match recipe.verb {
                CraftVerb::Combine => "combining",
                CraftVerb::Work => "working",
                CraftVerb::Apply => "applying a tool to",
            };
            hints.push(format!("Something can be made by {verb} {shared} with the right companion."));
        }
        hints.sort_unstable();
        hints.dedup();
        hints
    }

    /// Whether a kind label names a stackable resource (as opposed to a
    /// unique item kind).
    pub fn is_stackable(kind: &str) -> bool {
        ResourceKind::parse(kind).is_some()
    }

    /// All recipes.
    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }
}

impl Default for RecipeBook {
    /// The built-in recipe table.
    fn default() -> Self {
        let item = |kind: &str, properties: &[(&str, &str)]| RecipeOutput::Item {
            kind: kind.to_owned(),
            properties: properties
                .iter()
                .map(|(k, v)| ((*k).to_owned(), serde_json::Value::String((*v).to_owned())))
                .collect(),
        };
        let stack = |kind: ResourceKind, quantity: u32| RecipeOutput::Stack { kind, quantity };

        Self::from_recipes(vec![
            Recipe {
                verb: CraftVerb::Combine,
                inputs: vec![ResourceKind::Wood, ResourceKind::Wood],
                technique: None,
                output: stack(ResourceKind::Planks, 4),
                discoveries: vec![String::from(
                    "Split timber stacks neatly. Planks and cord might hold a shape together.",
                )],
            },
            Recipe {
                verb: CraftVerb::Combine,
                inputs: vec![ResourceKind::GrassFiber, ResourceKind::GrassFiber],
                technique: None,
                output: stack(ResourceKind::Cord, 1),
                discoveries: vec![String::from("Twisted fiber holds. A blade could turn cord into mesh.")],
            },
            Recipe {
                verb: CraftVerb::Combine,
                inputs: vec![ResourceKind::Wood, ResourceKind::Stone],
                technique: None,
                output: item("stone_axe", &[("edge", "keen")]),
                discoveries: vec![String::from("The axe bites. Standing timber could be split faster with it.")],
            },
            Recipe {
                verb: CraftVerb::Combine,
                inputs: vec![ResourceKind::Planks, ResourceKind::Cord],
                technique: None,
                output: item("bench", &[("seats", "two")]),
                discoveries: Vec::new(),
            },
            Recipe {
                verb: CraftVerb::Combine,
                inputs: vec![ResourceKind::Clay, ResourceKind::GrassFiber],
                technique: None,
                output: stack(ResourceKind::TemperedClay, 1),
                discoveries: vec![String::from("Fiber keeps the clay from cracking. Coiling it might hold water.")],
            },
            Recipe {
                verb: CraftVerb::Work,
                inputs: vec![ResourceKind::Wood],
                technique: Some(String::from("carve")),
                output: item("wooden_flute", &[("tone", "breathy")]),
                discoveries: Vec::new(),
            },
            Recipe {
                verb: CraftVerb::Work,
                inputs: vec![ResourceKind::Stone],
                technique: Some(String::from("knap")),
                output: item("stone_blade", &[("edge", "fine")]),
                discoveries: vec![String::from("A fine edge. Cord, mesh, hide -- things a blade could shape.")],
            },
            Recipe {
                verb: CraftVerb::Work,
                inputs: vec![ResourceKind::Clay],
                technique: Some(String::from("coil")),
                output: item("clay_pot", &[("holds", "water")]),
                discoveries: Vec::new(),
            },
            Recipe {
                verb: CraftVerb::Work,
                inputs: vec![ResourceKind::Planks],
                technique: Some(String::from("carve")),
                output: item("carved_panel", &[("motif", "plain")]),
                discoveries: Vec::new(),
            },
            Recipe {
                verb: CraftVerb::Apply,
                inputs: vec![ResourceKind::Wood],
                technique: Some(String::from("stone_axe")),
                output: stack(ResourceKind::Planks, 2),
                discoveries: Vec::new(),
            },
            Recipe {
                verb: CraftVerb::Apply,
                inputs: vec![ResourceKind::Cord],
                technique: Some(String::from("stone_blade")),
                output: item("net", &[("mesh", "wide")]),
                discoveries: Vec::new(),
            },
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_order_insensitive() {
        let book = RecipeBook::default();
        let a = book.lookup(CraftVerb::Combine, &[ResourceKind::Wood, ResourceKind::Stone], None);
        let b = book.lookup(CraftVerb::Combine, &[ResourceKind::Stone, ResourceKind::Wood], None);
        assert!(a.is_some());
        assert_eq!(a, b);
    }

    #[test]
    fn lookup_is_exact_on_technique() {
        let book = RecipeBook::default();
        assert!(book.lookup(CraftVerb::Work, &[ResourceKind::Wood], Some("carve")).is_some());
        assert!(book.lookup(CraftVerb::Work, &[ResourceKind::Wood], Some("knap")).is_none());
        assert!(book.lookup(CraftVerb::Work, &[ResourceKind::Wood], None).is_none());
    }

    #[test]
    fn apply_recipes_key_on_the_tool() {
        let book = RecipeBook::default();
        let recipe = book.lookup(CraftVerb::Apply, &[ResourceKind::Wood], Some("stone_axe"));
        assert_eq!(recipe.map(|r| r.output.quantity()), Some(2));
        assert!(book.lookup(CraftVerb::Apply, &[ResourceKind::Wood], Some("clay_pot")).is_none());
    }

    #[test]
    fn miss_produces_hints_sharing_an_input() {
        let book = RecipeBook::default();
        // No recipe combines wood and clay, but several use each.
        assert!(book.lookup(CraftVerb::Combine, &[ResourceKind::Wood, ResourceKind::Clay], None).is_none());
        let hints = book.hints(&[ResourceKind::Wood, ResourceKind::Clay]);
        assert!(!hints.is_empty());
        assert!(hints.iter().any(|h| h.contains("wood") || h.contains("clay")));
    }

    #[test]
    fn hints_for_an_unused_input_are_empty() {
        let book = RecipeBook::from_recipes(vec![Recipe {
            verb: CraftVerb::Combine,
            inputs: vec![ResourceKind::Wood, ResourceKind::Wood],
            technique: None,
            output: RecipeOutput::Stack {
                kind: ResourceKind::Planks,
                quantity: 4,
            },
            discoveries: Vec::new(),
        }]);
        assert!(book.hints(&[ResourceKind::Clay]).is_empty());
    }

    #[test]
    fn equal_inputs_produce_equal_outputs() {
        // Recipe determinism: two identical lookups give identical recipes.
        let book = RecipeBook::default();
        let a = book.lookup(CraftVerb::Combine, &[ResourceKind::Wood, ResourceKind::Wood], None).cloned();
        let b = book.lookup(CraftVerb::Combine, &[ResourceKind::Wood, ResourceKind::Wood], None).cloned();
        assert_eq!(a, b);
    }
}
