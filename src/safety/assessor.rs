//! Allergy and interaction assessment of generated suggestions.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::generator::TreatmentSuggestion;
use crate::intake::{MainSymptom, MedicalContext};
use crate::observability::metrics;
use crate::safety::knowledge::{self, DrugClass, Ingredient, TherapeuticRole};
use crate::safety::SafetyGap;

/// Result of one assessment. Built once per request and never mutated.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SafetyAssessment {
    pub allergic_medications: BTreeSet<String>,
    pub safe_alternatives: BTreeSet<String>,
    pub contraindicated_drugs: BTreeSet<String>,
    pub condition_interactions: Vec<String>,
    pub warnings: Vec<String>,
    /// Suggestions that survived every check, in generator order. Reported
    /// at the top level of the response rather than here.
    #[serde(skip)]
    pub recommended_medications: Vec<TreatmentSuggestion>,
    pub gaps: Vec<SafetyGap>,
}

impl SafetyAssessment {
    pub fn has_gaps(&self) -> bool {
        !self.gaps.is_empty()
    }

    pub fn is_recommended(&self, name: &str) -> bool {
        self.recommended_medications
            .iter()
            .any(|s| s.name.eq_ignore_ascii_case(name))
    }
}

/// One allergy entry with what the knowledge base makes of it.
struct Allergy {
    text: String,
    ingredient: Option<&'static Ingredient>,
    class: Option<DrugClass>,
}

impl Allergy {
    fn parse(raw: &str) -> Option<Self> {
        let text = knowledge::normalize(raw);
        if text.is_empty() {
            return None;
        }
        Some(Self {
            ingredient: knowledge::resolve_ingredient(&text),
            class: knowledge::resolve_allergy_class(&text),
            text,
        })
    }

    /// Class the allergy rules out entirely, if any.
    fn excluded_class(&self) -> Option<DrugClass> {
        self.class.or(self.ingredient.map(|i| i.class))
    }

    /// Direct hit: whole-term name overlap, shared ingredient, or a class
    /// the allergy names outright.
    fn matches(&self, name: &str, ingredient: Option<&'static Ingredient>) -> bool {
        if !name.is_empty()
            && (knowledge::contains_term(name, &self.text) || knowledge::contains_term(&self.text, name))
        {
            return true;
        }
        match ingredient {
            Some(found) => {
                self.ingredient.is_some_and(|own| own.name == found.name) || self.class == Some(found.class)
            }
            None => false,
        }
    }
}

/// Why a suggestion left the recommended set.
enum Withheld<'a> {
    Allergic(&'a Allergy),
    Contraindicated(&'a Allergy, DrugClass),
}

/// Cross-checks generated suggestions against the patient's allergies,
/// current medications and conditions.
///
/// Stateless; every call recomputes from its inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SafetyAssessor;

impl SafetyAssessor {
    pub fn new() -> Self {
        Self
    }

    pub fn assess(
        &self,
        context: &MedicalContext,
        suggestions: &[TreatmentSuggestion],
        complaint: Option<MainSymptom>,
    ) -> SafetyAssessment {
        let allergies: Vec<Allergy> = context.allergies.iter().filter_map(|a| Allergy::parse(a)).collect();
        let excluded = excluded_classes(&allergies);

        let mut out = SafetyAssessment::default();
        for class in &excluded {
            for member in knowledge::class_members(*class) {
                out.contraindicated_drugs.insert(member.name.to_string());
            }
        }

        let mut withheld: Vec<(&TreatmentSuggestion, Option<&'static Ingredient>)> = Vec::new();
        for suggestion in suggestions {
            let name = knowledge::normalize(&suggestion.name);
            let ingredient = knowledge::resolve_ingredient(&name);

            match withhold_reason(&allergies, &excluded, &name, ingredient) {
                Some(Withheld::Allergic(allergy)) => {
                    out.allergic_medications.insert(suggestion.name.clone());
                    out.warnings.push(format!(
                        "'{}' withheld: conflicts with reported allergy '{}'",
                        suggestion.name, allergy.text
                    ));
                    withheld.push((suggestion, ingredient));
                }
                Some(Withheld::Contraindicated(allergy, class)) => {
                    out.contraindicated_drugs.insert(suggestion.name.clone());
                    out.warnings.push(format!(
                        "'{}' withheld: {} is contraindicated by reported allergy '{}'",
                        suggestion.name,
                        class.label(),
                        allergy.text
                    ));
                    withheld.push((suggestion, ingredient));
                }
                None => out.recommended_medications.push(suggestion.clone()),
            }
        }

        for (suggestion, ingredient) in withheld {
            let alternatives = self.alternatives(&out, &allergies, &excluded, ingredient, complaint);
            if alternatives.is_empty() {
                let gap = SafetyGap::NoAlternativeKnown {
                    medication: suggestion.name.clone(),
                };
                out.warnings.push(gap.to_string());
                out.gaps.push(gap);
            } else {
                out.safe_alternatives.extend(alternatives);
            }
        }

        self.interactions(context, &mut out);

        metrics::record_safety_finding("allergy", out.allergic_medications.len());
        metrics::record_safety_finding("gap", out.gaps.len());
        metrics::record_safety_finding("condition_interaction", out.condition_interactions.len());

        out
    }

    /// Same-role substitutes for a withheld suggestion: recommended
    /// suggestions first, otherwise the knowledge base list filtered against
    /// the allergies. Unknown medications have no known alternative.
    fn alternatives(
        &self,
        out: &SafetyAssessment,
        allergies: &[Allergy],
        excluded: &BTreeSet<DrugClass>,
        ingredient: Option<&'static Ingredient>,
        complaint: Option<MainSymptom>,
    ) -> Vec<String> {
        let Some(role) = ingredient.map(|i| i.class.role()) else {
            return Vec::new();
        };

        let covered: Vec<String> = out
            .recommended_medications
            .iter()
            .filter(|s| role_of(&s.name) == Some(role))
            .map(|s| s.name.clone())
            .collect();
        if !covered.is_empty() {
            return covered;
        }

        knowledge::substitutes(complaint, role)
            .into_iter()
            .filter(|name| {
                let ingredient = knowledge::resolve_ingredient(name);
                withhold_reason(allergies, excluded, name, ingredient).is_none()
            })
            .map(str::to_string)
            .collect()
    }

    fn interactions(&self, context: &MedicalContext, out: &mut SafetyAssessment) {
        let mut condition_warnings = Vec::new();
        let mut medication_warnings = Vec::new();

        for suggestion in &out.recommended_medications {
            let Some(ingredient) = knowledge::resolve_ingredient(&suggestion.name) else {
                continue;
            };
            for condition in &context.medical_conditions {
                for warning in knowledge::condition_interactions(condition, ingredient.class) {
                    push_unique(&mut condition_warnings, format!("{}: {warning}", suggestion.name));
                }
            }
            for current in &context.current_medications {
                for warning in knowledge::medication_interactions(current, ingredient.class) {
                    push_unique(
                        &mut medication_warnings,
                        format!("{} with current medication '{}': {warning}", suggestion.name, current.trim()),
                    );
                }
            }
        }

        out.condition_interactions = condition_warnings;
        out.warnings.extend(medication_warnings);
    }
}

fn excluded_classes(allergies: &[Allergy]) -> BTreeSet<DrugClass> {
    let mut classes = BTreeSet::new();
    for class in allergies.iter().filter_map(Allergy::excluded_class) {
        classes.insert(class);
        classes.extend(class.cross_reactive().iter().copied());
    }
    classes
}

fn withhold_reason<'a>(
    allergies: &'a [Allergy],
    excluded: &BTreeSet<DrugClass>,
    name: &str,
    ingredient: Option<&'static Ingredient>,
) -> Option<Withheld<'a>> {
    let name = knowledge::normalize(name);
    if let Some(allergy) = allergies.iter().find(|a| a.matches(&name, ingredient)) {
        return Some(Withheld::Allergic(allergy));
    }

    let class = ingredient.map(|i| i.class).filter(|c| excluded.contains(c))?;
    allergies
        .iter()
        .find(|a| {
            a.excluded_class()
                .is_some_and(|own| own == class || own.cross_reactive().contains(&class))
        })
        .map(|allergy| Withheld::Contraindicated(allergy, class))
}

fn role_of(name: &str) -> Option<TherapeuticRole> {
    knowledge::resolve_ingredient(name).map(|i| i.class.role())
}

fn push_unique(list: &mut Vec<String>, item: String) {
    if !list.contains(&item) {
        list.push(item);
    }
}
