//! Specialist directory and the `findSpecialists` tool the assistant
//! can call to answer "who should I contact" questions.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::toolloop::LocalTool;

/// Static reference record for one lab specialist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub name: String,
    pub specialty: String,
    pub experience: String,
    pub education: String,
}

/// The lab team. Static reference data; the assistant queries it
/// through `findSpecialists` rather than receiving it in the prompt.
pub static DOCTORS: Lazy<Vec<Doctor>> = Lazy::new(|| {
    let raw = [
        (
            "Dr. Aigerim Bekova",
            "Veterinary Pathology",
            "15 years",
            "DVM, Kazakh National Agrarian University; residency in anatomic pathology",
        ),
        (
            "Dr. Marat Suleimenov",
            "Molecular Diagnostics",
            "11 years",
            "PhD in Molecular Biology, Al-Farabi Kazakh National University",
        ),
        (
            "Dr. Elena Kim",
            "Clinical Biochemistry",
            "9 years",
            "DVM with a specialization in laboratory medicine",
        ),
        (
            "Dr. Timur Akhmetov",
            "Microbiology and Antimicrobial Resistance",
            "13 years",
            "DVM, MSc in Veterinary Microbiology",
        ),
        (
            "Dr. Saule Nurlanova",
            "Hematology and Cytology",
            "7 years",
            "DVM; certified in clinical cytology",
        ),
        (
            "Dr. Viktor Pak",
            "Parasitology",
            "18 years",
            "DVM, doctoral work on zoonotic parasite surveillance",
        ),
    ];
    raw.iter()
        .map(|(name, specialty, experience, education)| Doctor {
            name: (*name).to_string(),
            specialty: (*specialty).to_string(),
            experience: (*experience).to_string(),
            education: (*education).to_string(),
        })
        .collect()
});

/// Case-insensitive substring search over specialty, name and
/// education. An empty query returns the whole team.
pub fn find_specialists(query: &str) -> Vec<Doctor> {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return DOCTORS.clone();
    }
    DOCTORS
        .iter()
        .filter(|d| {
            d.specialty.to_lowercase().contains(&q)
                || d.name.to_lowercase().contains(&q)
                || d.education.to_lowercase().contains(&q)
        })
        .cloned()
        .collect()
}

/// Function declaration advertised to the model.
pub fn find_specialists_declaration() -> Value {
    json!({
        "name": "findSpecialists",
        "description": "Search lab specialists by specialty, name, or education. \
            Use when the user asks about the team, who to contact, or a specific \
            area (e.g. pathology, molecular, biochemistry).",
        "parameters": {
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query for specialty or area (e.g. pathology, molecular)"
                }
            },
            "required": ["query"]
        }
    })
}

/// `tools` / `toolConfig` values that restrict the model to this one
/// function.
pub fn specialists_tooling() -> (Value, Value) {
    (
        json!([{ "functionDeclarations": [find_specialists_declaration()] }]),
        json!({
            "functionCallingConfig": {
                "mode": "ANY",
                "allowedFunctionNames": ["findSpecialists"]
            }
        }),
    )
}

/// [`LocalTool`] adapter for the tool-calling loop.
pub struct SpecialistsTool;

impl LocalTool for SpecialistsTool {
    fn name(&self) -> &str {
        "findSpecialists"
    }

    fn response_key(&self) -> &str {
        "specialists"
    }

    fn call(&self, args: &Map<String, Value>) -> Value {
        let query = args.get("query").and_then(|v| v.as_str()).unwrap_or("");
        serde_json::to_value(find_specialists(query)).unwrap_or_else(|_| json!([]))
    }
}
