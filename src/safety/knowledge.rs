//! Static drug knowledge base.
//!
//! Names resolve brand/alias → active ingredient → drug class → therapeutic
//! role. Everything here is lookup data; nothing is inferred beyond it.

use serde::Serialize;

use crate::intake::MainSymptom;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DrugClass {
    Penicillin,
    Cephalosporin,
    Macrolide,
    Tetracycline,
    Sulfonamide,
    Fluoroquinolone,
    Nitroimidazole,
    Lincosamide,
    AzoleAntifungal,
    PolyeneAntifungal,
    Nsaid,
    Paracetamol,
    Antifibrinolytic,
    CombinedHormonal,
    Progestin,
    IronSupplement,
}

/// What a medication is for. Substitutes are only proposed within a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TherapeuticRole {
    AntiInfective,
    Analgesic,
    Hemostatic,
    Hormonal,
    Supplement,
}

impl DrugClass {
    pub fn role(&self) -> TherapeuticRole {
        match self {
            DrugClass::Penicillin
            | DrugClass::Cephalosporin
            | DrugClass::Macrolide
            | DrugClass::Tetracycline
            | DrugClass::Sulfonamide
            | DrugClass::Fluoroquinolone
            | DrugClass::Nitroimidazole
            | DrugClass::Lincosamide
            | DrugClass::AzoleAntifungal
            | DrugClass::PolyeneAntifungal => TherapeuticRole::AntiInfective,
            DrugClass::Nsaid | DrugClass::Paracetamol => TherapeuticRole::Analgesic,
            DrugClass::Antifibrinolytic => TherapeuticRole::Hemostatic,
            DrugClass::CombinedHormonal | DrugClass::Progestin => TherapeuticRole::Hormonal,
            DrugClass::IronSupplement => TherapeuticRole::Supplement,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DrugClass::Penicillin => "penicillin",
            DrugClass::Cephalosporin => "cephalosporin",
            DrugClass::Macrolide => "macrolide",
            DrugClass::Tetracycline => "tetracycline",
            DrugClass::Sulfonamide => "sulfonamide",
            DrugClass::Fluoroquinolone => "fluoroquinolone",
            DrugClass::Nitroimidazole => "nitroimidazole",
            DrugClass::Lincosamide => "lincosamide",
            DrugClass::AzoleAntifungal => "azole antifungal",
            DrugClass::PolyeneAntifungal => "polyene antifungal",
            DrugClass::Nsaid => "NSAID",
            DrugClass::Paracetamol => "paracetamol",
            DrugClass::Antifibrinolytic => "antifibrinolytic",
            DrugClass::CombinedHormonal => "combined hormonal contraceptive",
            DrugClass::Progestin => "progestin",
            DrugClass::IronSupplement => "iron supplement",
        }
    }

    /// Classes an allergy to `self` also rules out.
    pub fn cross_reactive(&self) -> &'static [DrugClass] {
        match self {
            DrugClass::Penicillin => &[DrugClass::Cephalosporin],
            DrugClass::Cephalosporin => &[DrugClass::Penicillin],
            _ => &[],
        }
    }
}

/// An active ingredient.
#[derive(Debug)]
pub struct Ingredient {
    pub name: &'static str,
    pub class: DrugClass,
    pub aliases: &'static [&'static str],
}

pub static INGREDIENTS: &[Ingredient] = &[
    Ingredient { name: "amoxicillin", class: DrugClass::Penicillin, aliases: &["amoxil", "augmentin", "co-amoxiclav"] },
    Ingredient { name: "ampicillin", class: DrugClass::Penicillin, aliases: &["principen"] },
    Ingredient { name: "penicillin v", class: DrugClass::Penicillin, aliases: &["phenoxymethylpenicillin", "pen vk"] },
    Ingredient { name: "benzathine penicillin", class: DrugClass::Penicillin, aliases: &["bicillin"] },
    Ingredient { name: "cefalexin", class: DrugClass::Cephalosporin, aliases: &["cephalexin", "keflex"] },
    Ingredient { name: "ceftriaxone", class: DrugClass::Cephalosporin, aliases: &["rocephin"] },
    Ingredient { name: "cefixime", class: DrugClass::Cephalosporin, aliases: &["suprax"] },
    Ingredient { name: "azithromycin", class: DrugClass::Macrolide, aliases: &["zithromax", "z-pak"] },
    Ingredient { name: "erythromycin", class: DrugClass::Macrolide, aliases: &["erythrocin"] },
    Ingredient { name: "doxycycline", class: DrugClass::Tetracycline, aliases: &["vibramycin", "doryx"] },
    Ingredient { name: "sulfamethoxazole", class: DrugClass::Sulfonamide, aliases: &["bactrim", "septra", "co-trimoxazole", "trimethoprim-sulfamethoxazole"] },
    Ingredient { name: "ciprofloxacin", class: DrugClass::Fluoroquinolone, aliases: &["cipro"] },
    Ingredient { name: "levofloxacin", class: DrugClass::Fluoroquinolone, aliases: &["levaquin"] },
    Ingredient { name: "metronidazole", class: DrugClass::Nitroimidazole, aliases: &["flagyl", "metrogel"] },
    Ingredient { name: "tinidazole", class: DrugClass::Nitroimidazole, aliases: &["tindamax"] },
    Ingredient { name: "clindamycin", class: DrugClass::Lincosamide, aliases: &["cleocin", "dalacin"] },
    Ingredient { name: "fluconazole", class: DrugClass::AzoleAntifungal, aliases: &["diflucan"] },
    Ingredient { name: "clotrimazole", class: DrugClass::AzoleAntifungal, aliases: &["canesten", "gyne-lotrimin"] },
    Ingredient { name: "miconazole", class: DrugClass::AzoleAntifungal, aliases: &["monistat"] },
    Ingredient { name: "terconazole", class: DrugClass::AzoleAntifungal, aliases: &["terazol"] },
    Ingredient { name: "nystatin", class: DrugClass::PolyeneAntifungal, aliases: &["mycostatin"] },
    Ingredient { name: "ibuprofen", class: DrugClass::Nsaid, aliases: &["advil", "motrin", "nurofen"] },
    Ingredient { name: "naproxen", class: DrugClass::Nsaid, aliases: &["aleve", "naprosyn"] },
    Ingredient { name: "mefenamic acid", class: DrugClass::Nsaid, aliases: &["ponstan", "ponstel"] },
    Ingredient { name: "diclofenac", class: DrugClass::Nsaid, aliases: &["voltaren", "cataflam"] },
    Ingredient { name: "aspirin", class: DrugClass::Nsaid, aliases: &["acetylsalicylic acid"] },
    Ingredient { name: "paracetamol", class: DrugClass::Paracetamol, aliases: &["acetaminophen", "tylenol", "panadol"] },
    Ingredient { name: "tranexamic acid", class: DrugClass::Antifibrinolytic, aliases: &["lysteda", "cyklokapron"] },
    Ingredient { name: "ethinylestradiol/levonorgestrel", class: DrugClass::CombinedHormonal, aliases: &["combined oral contraceptive", "microgynon", "levora"] },
    Ingredient { name: "norethisterone", class: DrugClass::Progestin, aliases: &["norethindrone", "primolut"] },
    Ingredient { name: "medroxyprogesterone", class: DrugClass::Progestin, aliases: &["provera", "depo-provera"] },
    Ingredient { name: "ferrous sulfate", class: DrugClass::IronSupplement, aliases: &["feosol", "ferrous sulphate"] },
];

/// Allergy wording that names a whole class rather than one ingredient.
/// Matched as whole terms, so "ferrous sulfate" is not a sulfa allergy.
static CLASS_KEYWORDS: &[(&str, DrugClass)] = &[
    ("penicillin", DrugClass::Penicillin),
    ("penicillins", DrugClass::Penicillin),
    ("cephalosporin", DrugClass::Cephalosporin),
    ("cephalosporins", DrugClass::Cephalosporin),
    ("macrolide", DrugClass::Macrolide),
    ("macrolides", DrugClass::Macrolide),
    ("tetracycline", DrugClass::Tetracycline),
    ("tetracyclines", DrugClass::Tetracycline),
    ("sulfa", DrugClass::Sulfonamide),
    ("sulpha", DrugClass::Sulfonamide),
    ("sulfonamide", DrugClass::Sulfonamide),
    ("sulfonamides", DrugClass::Sulfonamide),
    ("quinolone", DrugClass::Fluoroquinolone),
    ("quinolones", DrugClass::Fluoroquinolone),
    ("fluoroquinolone", DrugClass::Fluoroquinolone),
    ("fluoroquinolones", DrugClass::Fluoroquinolone),
    ("azoles", DrugClass::AzoleAntifungal),
    ("azole antifungals", DrugClass::AzoleAntifungal),
    ("nsaid", DrugClass::Nsaid),
    ("nsaids", DrugClass::Nsaid),
    ("anti-inflammatory", DrugClass::Nsaid),
    ("anti-inflammatories", DrugClass::Nsaid),
];

/// Lowercase and trim a free-text medication or allergy entry.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Resolve a free-text medication name (ingredient, brand or alias,
/// possibly with a dose like "Diflucan 150mg") to its ingredient.
pub fn resolve_ingredient(text: &str) -> Option<&'static Ingredient> {
    let text = normalize(text);
    if text.is_empty() {
        return None;
    }
    INGREDIENTS.iter().find(|ingredient| {
        contains_term(&text, ingredient.name) || ingredient.aliases.iter().any(|alias| contains_term(&text, alias))
    })
}

/// Class named outright by an allergy entry such as "sulfa drugs" or
/// "penicillins". Single-ingredient allergies return `None` here.
pub fn resolve_allergy_class(allergy: &str) -> Option<DrugClass> {
    let text = normalize(allergy);
    CLASS_KEYWORDS
        .iter()
        .find(|(keyword, _)| contains_term(&text, keyword))
        .map(|(_, class)| *class)
}

/// Every ingredient belonging to `class`.
pub fn class_members(class: DrugClass) -> impl Iterator<Item = &'static Ingredient> {
    INGREDIENTS.iter().filter(move |i| i.class == class)
}

/// Whole-word containment: "aspirin" does not match inside "aspiring".
pub(crate) fn contains_term(haystack: &str, term: &str) -> bool {
    haystack.match_indices(term).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + term.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

/// Known substitutes per (complaint, role), in preference order. Only
/// consulted when no suggestion already covers the role.
static SUBSTITUTES: &[(MainSymptom, TherapeuticRole, &[&str])] = &[
    (MainSymptom::VaginalDischarge, TherapeuticRole::AntiInfective, &["clotrimazole", "nystatin", "metronidazole", "clindamycin"]),
    (MainSymptom::PelvicPain, TherapeuticRole::AntiInfective, &["doxycycline", "azithromycin", "metronidazole"]),
    (MainSymptom::PelvicPain, TherapeuticRole::Analgesic, &["paracetamol", "ibuprofen", "naproxen"]),
    (MainSymptom::PainfulPeriods, TherapeuticRole::Analgesic, &["paracetamol", "naproxen", "mefenamic acid"]),
    (MainSymptom::PainfulPeriods, TherapeuticRole::Hormonal, &["ethinylestradiol/levonorgestrel", "norethisterone"]),
    (MainSymptom::ExcessiveVaginalBleeding, TherapeuticRole::Hemostatic, &["tranexamic acid"]),
    (MainSymptom::ExcessiveVaginalBleeding, TherapeuticRole::Analgesic, &["mefenamic acid", "naproxen"]),
    (MainSymptom::ExcessiveVaginalBleeding, TherapeuticRole::Hormonal, &["norethisterone", "medroxyprogesterone"]),
    (MainSymptom::ExcessiveVaginalBleeding, TherapeuticRole::Supplement, &["ferrous sulfate"]),
    (MainSymptom::MissedPeriod, TherapeuticRole::Hormonal, &["medroxyprogesterone"]),
];

/// Substitute ingredients for a role, falling back to any complaint's list
/// when the complaint is unknown.
pub fn substitutes(complaint: Option<MainSymptom>, role: TherapeuticRole) -> Vec<&'static str> {
    let mut out: Vec<&'static str> = Vec::new();
    for (symptom, r, names) in SUBSTITUTES {
        if *r == role && complaint.map_or(true, |c| c == *symptom) {
            for name in names.iter() {
                if !out.contains(name) {
                    out.push(*name);
                }
            }
        }
    }
    out
}

/// (condition keyword, class, warning)
static CONDITION_INTERACTIONS: &[(&str, DrugClass, &str)] = &[
    ("diabetes", DrugClass::Fluoroquinolone, "fluoroquinolones can disturb blood glucose in diabetes; monitor glucose closely"),
    ("diabetes", DrugClass::AzoleAntifungal, "diabetes increases recurrence of fungal infections; check glycaemic control"),
    ("kidney", DrugClass::Nsaid, "NSAIDs can worsen kidney function"),
    ("renal", DrugClass::Nsaid, "NSAIDs can worsen kidney function"),
    ("asthma", DrugClass::Nsaid, "NSAIDs can trigger bronchospasm in aspirin-sensitive asthma"),
    ("ulcer", DrugClass::Nsaid, "NSAIDs raise the risk of gastrointestinal bleeding with a history of ulcers"),
    ("liver", DrugClass::AzoleAntifungal, "azole antifungals are hepatically cleared; use caution in liver disease"),
    ("liver", DrugClass::Tetracycline, "tetracyclines can be hepatotoxic; use caution in liver disease"),
    ("hypertension", DrugClass::CombinedHormonal, "combined hormonal contraceptives can raise blood pressure"),
    ("migraine", DrugClass::CombinedHormonal, "combined hormonal contraceptives are unsuitable with migraine with aura"),
    ("thrombo", DrugClass::CombinedHormonal, "combined hormonal contraceptives raise thrombosis risk"),
    ("thrombo", DrugClass::Antifibrinolytic, "tranexamic acid is contraindicated with a history of thromboembolism"),
    ("clot", DrugClass::Antifibrinolytic, "tranexamic acid is contraindicated with a history of thromboembolism"),
    ("long qt", DrugClass::Macrolide, "macrolides can prolong the QT interval"),
    ("long qt", DrugClass::Fluoroquinolone, "fluoroquinolones can prolong the QT interval"),
    ("epilepsy", DrugClass::Fluoroquinolone, "fluoroquinolones can lower the seizure threshold"),
];

/// Warnings for one (condition, class) pair. No mapping yields nothing.
pub fn condition_interactions(condition: &str, class: DrugClass) -> impl Iterator<Item = &'static str> {
    let condition = normalize(condition);
    CONDITION_INTERACTIONS
        .iter()
        .filter(move |(keyword, c, _)| *c == class && condition.contains(keyword))
        .map(|(_, _, warning)| *warning)
}

/// (current medication ingredient or keyword, class, warning)
static MEDICATION_INTERACTIONS: &[(&str, DrugClass, &str)] = &[
    ("warfarin", DrugClass::AzoleAntifungal, "azole antifungals potentiate warfarin; monitor INR"),
    ("warfarin", DrugClass::Nitroimidazole, "metronidazole potentiates warfarin; monitor INR"),
    ("warfarin", DrugClass::Nsaid, "NSAIDs with warfarin increase bleeding risk"),
    ("warfarin", DrugClass::Macrolide, "macrolides can potentiate warfarin; monitor INR"),
    ("lithium", DrugClass::Nsaid, "NSAIDs raise lithium levels"),
    ("methotrexate", DrugClass::Nsaid, "NSAIDs reduce methotrexate clearance"),
    ("methotrexate", DrugClass::Sulfonamide, "sulfonamides increase methotrexate toxicity"),
    ("citalopram", DrugClass::Macrolide, "combined QT-prolonging effect with citalopram"),
    ("sertraline", DrugClass::Nsaid, "SSRIs with NSAIDs increase gastrointestinal bleeding risk"),
    ("fluoxetine", DrugClass::Nsaid, "SSRIs with NSAIDs increase gastrointestinal bleeding risk"),
    ("rifampicin", DrugClass::CombinedHormonal, "rifampicin makes hormonal contraception unreliable"),
    ("lamotrigine", DrugClass::CombinedHormonal, "combined hormonal contraceptives lower lamotrigine levels"),
];

pub fn medication_interactions(current: &str, class: DrugClass) -> impl Iterator<Item = &'static str> {
    let current = normalize(current);
    MEDICATION_INTERACTIONS
        .iter()
        .filter(move |(keyword, c, _)| *c == class && current.contains(keyword))
        .map(|(_, _, warning)| *warning)
}
