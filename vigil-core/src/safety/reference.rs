//! Read-only clinical reference data
//!
//! Interaction rules, allergy cross-reactivity classes, drug synonyms, and
//! red-flag patterns. Loaded once at startup; the evaluators hold it
//! immutably for the process lifetime. Severity and contraindication logic
//! is data here, not branching code, so tables can change without code
//! changes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{Result, VigilError};
use crate::safety::Severity;
use crate::task::VitalSigns;

/// One drug-drug interaction fact. The pair is unordered: lookups resolve
/// (A,B) and (B,A) to the same rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRule {
    pub drug_a: String,
    pub drug_b: String,
    pub severity: Severity,
    pub mechanism: String,
    pub recommendation: String,

    /// Absolute contraindication, independent of severity.
    #[serde(default)]
    pub blocking: bool,
}

/// Which vital sign a threshold reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VitalKind {
    SystolicBp,
    DiastolicBp,
    HeartRate,
    RespiratoryRate,
    TemperatureC,
    Spo2Percent,
}

/// A numeric vital-sign predicate. An absent vital never satisfies it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VitalThreshold {
    pub vital: VitalKind,
    pub above: Option<f64>,
    pub below: Option<f64>,
}

impl VitalThreshold {
    pub fn satisfied_by(&self, vitals: &VitalSigns) -> bool {
        let value = match self.vital {
            VitalKind::SystolicBp => vitals.systolic_bp,
            VitalKind::DiastolicBp => vitals.diastolic_bp,
            VitalKind::HeartRate => vitals.heart_rate,
            VitalKind::RespiratoryRate => vitals.respiratory_rate,
            VitalKind::TemperatureC => vitals.temperature_c,
            VitalKind::Spo2Percent => vitals.spo2_percent,
        };
        let Some(value) = value else {
            return false;
        };
        if let Some(above) = self.above
            && value > above
        {
            return true;
        }
        if let Some(below) = self.below
            && value < below
        {
            return true;
        }
        false
    }
}

/// A red-flag pattern: a primary symptom match plus corroboration from
/// either a context keyword or a vital-sign threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedFlagRule {
    pub name: String,

    /// Primary symptom keywords; at least one must appear.
    pub symptoms_any: Vec<String>,

    /// Corroborating symptom keywords; any one counts.
    #[serde(default)]
    pub corroborating_any: Vec<String>,

    /// Corroborating vital thresholds; any one satisfied counts.
    #[serde(default)]
    pub vitals_any: Vec<VitalThreshold>,

    /// If false, a primary match alone fires the rule.
    #[serde(default = "default_true")]
    pub requires_corroboration: bool,

    /// Conditions this pattern suggests, used in the finding rationale.
    #[serde(default)]
    pub suggested_conditions: Vec<String>,
}

fn default_true() -> bool {
    true
}

/// Static reference tables consumed by the safety evaluators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceData {
    pub interactions: Vec<InteractionRule>,

    /// Allergy class -> cross-reactive drug names
    pub allergy_classes: BTreeMap<String, Vec<String>>,

    /// Canonical drug name -> trade-name/synonym list
    pub synonyms: BTreeMap<String, Vec<String>>,

    pub red_flags: Vec<RedFlagRule>,
}

impl ReferenceData {
    /// Load from a YAML or JSON file, by extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| VigilError::ReferenceData(format!("cannot read {}: {}", path.display(), e)))?;

        let data: ReferenceData = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&raw)
                .map_err(|e| VigilError::ReferenceData(format!("invalid YAML: {}", e)))?,
            _ => serde_json::from_str(&raw)
                .map_err(|e| VigilError::ReferenceData(format!("invalid JSON: {}", e)))?,
        };

        data.validate()?;
        Ok(data)
    }

    fn validate(&self) -> Result<()> {
        for rule in &self.interactions {
            if rule.drug_a.trim().is_empty() || rule.drug_b.trim().is_empty() {
                return Err(VigilError::ReferenceData(
                    "interaction rule with empty drug name".to_string(),
                ));
            }
        }
        for rule in &self.red_flags {
            if rule.symptoms_any.is_empty() {
                return Err(VigilError::ReferenceData(format!(
                    "red-flag rule '{}' has no primary symptoms",
                    rule.name
                )));
            }
        }
        Ok(())
    }

    /// Built-in tables, seeded with the high-evidence interactions and
    /// danger patterns the system ships with.
    pub fn builtin() -> Self {
        let interactions = vec![
            rule("Warfarin", "Ibuprofen", Severity::Major, false,
                "Antiplatelet effect and GI ulceration increase bleeding risk",
                "Avoid combination; use acetaminophen for pain"),
            rule("Warfarin", "Aspirin", Severity::Major, false,
                "Additive anticoagulant effect",
                "Use with extreme caution; monitor INR closely"),
            rule("Warfarin", "Ciprofloxacin", Severity::Major, false,
                "Fluoroquinolones potentiate warfarin effect",
                "Monitor INR frequently; reduce warfarin dose"),
            rule("Lisinopril", "Potassium", Severity::Major, false,
                "ACE inhibitors reduce potassium excretion",
                "Avoid potassium supplements; monitor serum potassium"),
            rule("Lisinopril", "Ibuprofen", Severity::Major, false,
                "ACE inhibitor + NSAID renal injury risk",
                "Avoid combination; monitor renal function closely"),
            rule("Digoxin", "Amiodarone", Severity::Major, false,
                "Amiodarone raises digoxin levels",
                "Reduce digoxin dose by 50%; monitor levels"),
            rule("Metformin", "Iodinated Contrast", Severity::Critical, true,
                "Lactic acidosis risk",
                "Stop metformin 48h before contrast; resume 48h after"),
            rule("Insulin", "Propranolol", Severity::Moderate, false,
                "Beta blockers mask hypoglycemia symptoms",
                "Monitor glucose closely; educate patient"),
            rule("Fluoxetine", "Phenelzine", Severity::Critical, true,
                "Serotonin syndrome risk",
                "Do not combine; 2-week washout required"),
            rule("Morphine", "Diazepam", Severity::Major, false,
                "Additive CNS and respiratory depression",
                "Use lowest effective doses; monitor closely"),
            rule("Atorvastatin", "Clarithromycin", Severity::Major, false,
                "Macrolides inhibit statin metabolism",
                "Hold statin during macrolide therapy"),
            rule("Clopidogrel", "Omeprazole", Severity::Moderate, false,
                "PPIs may reduce clopidogrel activation",
                "Consider pantoprazole or an H2 blocker"),
            rule("Warfarin", "Vitamin K", Severity::Major, false,
                "Vitamin K antagonizes warfarin effect",
                "Maintain consistent vitamin K intake"),
            rule("Ibuprofen", "Prednisone", Severity::Major, false,
                "Additive GI ulcer risk",
                "Use gastroprotection; avoid if possible"),
        ];

        let allergy_classes = BTreeMap::from([
            (
                "Penicillin".to_string(),
                vec![
                    "Amoxicillin".to_string(),
                    "Ampicillin".to_string(),
                    "Amoxicillin-clavulanate".to_string(),
                    "Piperacillin".to_string(),
                ],
            ),
            (
                "Sulfonamides".to_string(),
                vec![
                    "Sulfamethoxazole".to_string(),
                    "Sulfasalazine".to_string(),
                    "Furosemide".to_string(),
                ],
            ),
            (
                "NSAIDs".to_string(),
                vec![
                    "Ibuprofen".to_string(),
                    "Naproxen".to_string(),
                    "Diclofenac".to_string(),
                    "Ketorolac".to_string(),
                    "Aspirin".to_string(),
                ],
            ),
            (
                "Opioids".to_string(),
                vec![
                    "Codeine".to_string(),
                    "Morphine".to_string(),
                    "Oxycodone".to_string(),
                    "Hydromorphone".to_string(),
                ],
            ),
            (
                "ACE Inhibitors".to_string(),
                vec![
                    "Lisinopril".to_string(),
                    "Enalapril".to_string(),
                    "Ramipril".to_string(),
                    "Captopril".to_string(),
                ],
            ),
            (
                "Statins".to_string(),
                vec![
                    "Atorvastatin".to_string(),
                    "Simvastatin".to_string(),
                    "Rosuvastatin".to_string(),
                    "Pravastatin".to_string(),
                ],
            ),
            (
                "Quinolones".to_string(),
                vec![
                    "Ciprofloxacin".to_string(),
                    "Levofloxacin".to_string(),
                    "Moxifloxacin".to_string(),
                ],
            ),
        ]);

        let synonyms = BTreeMap::from([
            ("Ibuprofen".to_string(), vec!["Advil".to_string(), "Motrin".to_string(), "Brufen".to_string()]),
            ("Acetaminophen".to_string(), vec!["Paracetamol".to_string(), "Tylenol".to_string()]),
            ("Aspirin".to_string(), vec!["Acetylsalicylic acid".to_string(), "ASA".to_string()]),
            ("Lisinopril".to_string(), vec!["Zestril".to_string(), "Prinivil".to_string()]),
            ("Atorvastatin".to_string(), vec!["Lipitor".to_string()]),
            ("Metformin".to_string(), vec!["Glucophage".to_string()]),
            ("Metoprolol".to_string(), vec!["Lopressor".to_string(), "Toprol-XL".to_string()]),
            ("Omeprazole".to_string(), vec!["Prilosec".to_string(), "Losec".to_string()]),
            ("Warfarin".to_string(), vec!["Coumadin".to_string(), "Jantoven".to_string()]),
            ("Digoxin".to_string(), vec!["Lanoxin".to_string()]),
        ]);

        let red_flags = vec![
            RedFlagRule {
                name: "acute coronary syndrome pattern".to_string(),
                symptoms_any: strs(&["chest pain", "chest pressure", "chest tightness", "crushing"]),
                corroborating_any: strs(&[
                    "radiates to arm", "radiation", "jaw", "neck", "sweating", "diaphoresis",
                    "nausea",
                ]),
                vitals_any: vec![VitalThreshold {
                    vital: VitalKind::HeartRate,
                    above: Some(120.0),
                    below: None,
                }],
                requires_corroboration: true,
                suggested_conditions: strs(&["Myocardial Infarction", "Angina", "Aortic Dissection"]),
            },
            RedFlagRule {
                name: "respiratory distress pattern".to_string(),
                symptoms_any: strs(&["shortness of breath", "difficulty breathing", "dyspnea"]),
                corroborating_any: strs(&["chest pain", "wheezing", "cyanosis"]),
                vitals_any: vec![
                    VitalThreshold {
                        vital: VitalKind::Spo2Percent,
                        above: None,
                        below: Some(92.0),
                    },
                    VitalThreshold {
                        vital: VitalKind::RespiratoryRate,
                        above: Some(24.0),
                        below: None,
                    },
                ],
                requires_corroboration: true,
                suggested_conditions: strs(&["Pulmonary Embolism", "Heart Failure", "Asthma Attack"]),
            },
            RedFlagRule {
                name: "thunderclap headache pattern".to_string(),
                symptoms_any: strs(&["severe headache", "worst headache", "thunderclap"]),
                corroborating_any: strs(&["neck stiffness", "confusion", "vision changes", "fever"]),
                vitals_any: vec![],
                requires_corroboration: false,
                suggested_conditions: strs(&["Subarachnoid Hemorrhage", "Meningitis"]),
            },
            RedFlagRule {
                name: "sepsis pattern".to_string(),
                symptoms_any: strs(&["fever", "chills", "rigors"]),
                corroborating_any: strs(&["confusion", "rash", "difficulty breathing"]),
                vitals_any: vec![
                    VitalThreshold {
                        vital: VitalKind::SystolicBp,
                        above: None,
                        below: Some(90.0),
                    },
                    VitalThreshold {
                        vital: VitalKind::TemperatureC,
                        above: Some(39.5),
                        below: None,
                    },
                ],
                requires_corroboration: true,
                suggested_conditions: strs(&["Sepsis", "Severe Infection"]),
            },
            RedFlagRule {
                name: "acute abdomen pattern".to_string(),
                symptoms_any: strs(&["abdominal pain", "stomach pain"]),
                corroborating_any: strs(&["rigid abdomen", "vomiting", "shoulder pain", "fever"]),
                vitals_any: vec![],
                requires_corroboration: true,
                suggested_conditions: strs(&["Appendicitis", "Pancreatitis", "Perforated Ulcer"]),
            },
        ];

        Self {
            interactions,
            allergy_classes,
            synonyms,
            red_flags,
        }
    }
}

fn rule(
    a: &str,
    b: &str,
    severity: Severity,
    blocking: bool,
    mechanism: &str,
    recommendation: &str,
) -> InteractionRule {
    InteractionRule {
        drug_a: a.to_string(),
        drug_b: b.to_string(),
        severity,
        mechanism: mechanism.to_string(),
        recommendation: recommendation.to_string(),
        blocking,
    }
}

fn strs(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_tables_are_valid() {
        let data = ReferenceData::builtin();
        assert!(data.validate().is_ok());
        assert!(!data.interactions.is_empty());
        assert!(!data.red_flags.is_empty());
    }

    #[test]
    fn test_builtin_has_blocking_contraindication() {
        let data = ReferenceData::builtin();
        assert!(data.interactions.iter().any(|r| r.blocking));
    }

    #[test]
    fn test_vital_threshold_absent_value_never_fires() {
        let threshold = VitalThreshold {
            vital: VitalKind::HeartRate,
            above: Some(120.0),
            below: None,
        };
        assert!(!threshold.satisfied_by(&VitalSigns::default()));

        let vitals = VitalSigns {
            heart_rate: Some(130.0),
            ..Default::default()
        };
        assert!(threshold.satisfied_by(&vitals));
    }

    #[test]
    fn test_from_file_yaml() {
        let data = ReferenceData::builtin();
        let yaml = serde_yaml::to_string(&data).unwrap();

        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let loaded = ReferenceData::from_file(file.path()).unwrap();
        assert_eq!(loaded.interactions.len(), data.interactions.len());
        assert_eq!(loaded.red_flags.len(), data.red_flags.len());
    }

    #[test]
    fn test_from_file_rejects_empty_symptom_rule() {
        let json = r#"{
            "interactions": [],
            "allergy_classes": {},
            "synonyms": {},
            "red_flags": [{"name": "bad", "symptoms_any": []}]
        }"#;

        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        assert!(ReferenceData::from_file(file.path()).is_err());
    }
}
