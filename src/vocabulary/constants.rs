//! Fixed concept ids and lookup tables used by the conversion.

/// Standard visit concept of every ICU admission (Intensive Care)
pub const VISIT_CONCEPT_ID: i32 = 32037;
/// Visit type: visit derived from EHR record
pub const VISIT_TYPE_CONCEPT_ID: i32 = 44818518;
/// Observation type: from physical examination
pub const OBSERVATION_TYPE_CONCEPT_ID: i32 = 38000280;
/// Drug type: physician administered drug (identified from EHR observation)
pub const DRUG_TYPE_CONCEPT_ID: i32 = 43542358;

/// Gender concept for sex code 1
pub const MALE_CONCEPT_ID: i32 = 8507;
/// Gender concept for sex code 0
pub const FEMALE_CONCEPT_ID: i32 = 8532;

/// Country concepts referenced by LOCATION
pub const UNITED_STATES_CONCEPT_ID: i32 = 4330442;
/// Netherlands
pub const NETHERLANDS_CONCEPT_ID: i32 = 4320169;
/// Switzerland
pub const SWITZERLAND_CONCEPT_ID: i32 = 4330427;

/// Concept name the vocabulary uses for concept 0
pub const NO_MATCHING_CONCEPT: &str = "No matching concept";

/// Visit-type keys used for admission origins, discharge destinations and unit types
pub const VISIT_CONCEPT_IDS: &[(&str, i32)] = &[
    ("emergency", 9203),      // Visit
    ("other", 8844),          // CMS Place of Service
    ("operating_room", 4021813),
    ("direct_admit", 4139502),
    ("icu", 4148981),
    ("unknown", 0),
    ("death", 0),
    ("home", 4139502),
    ("hospital", 4318944),
    ("rehab", 38004285), // NUCC
    ("medical_icu", 40481392),
    ("cardiac_icu", 4149943),
    ("surgical_icu", 4305366),
    ("trauma_icu", 763903),
    ("neuro_icu", 4148496),
    ("medical_surgical_icu", 4160026),
];

/// Unit concept of each measured variable
pub const UNIT_CONCEPT_IDS: &[(&str, i32)] = &[
    ("raw_age", 9448),
    ("raw_height", 8582),
    ("raw_weight", 9529),
    ("heart_rate", 8541),
    ("invasive_systolic_blood_pressure", 8876),
    ("invasive_diastolic_blood_pressure", 8876),
    ("invasive_mean_blood_pressure", 8876),
    ("noninvasive_systolic_blood_pressure", 8876),
    ("noninvasive_diastolic_blood_pressure", 8876),
    ("noninvasive_mean_blood_pressure", 8876),
    ("respiratory_rate_setting", 8541),
    ("tidal_volume_setting", 9571),
    ("plateau_pressure", 44777590),
    ("O2_pulseoxymetry_saturation", 8554),
    ("O2_arterial_saturation", 8554),
    ("lactate", 8861),
    ("blood_glucose", 8753),
    ("magnesium", 8753),
    ("sodium", 8753),
    ("creatinine", 8749),
    ("calcium", 8749),
    ("temperature", 586323),
    ("FiO2", 8554),
    ("chloride", 8554),
    ("phosphate", 8840),
    ("bicarbonate", 8753),
    ("pH", 8482),
    ("paO2", 8482),
    ("paCO2", 8482),
    ("potassium", 8753),
    ("PTT", 8555),
    ("bilirubine", 8749),
    ("urine_output", 44777613),
    ("alanine_aminotransferase", 8645),
    ("aspartate_aminotransferase", 8645),
    ("alkaline_phosphatase", 8645),
    ("respiratory_rate", 8541),
    ("albumin", 8636),
    ("blood_urea_nitrogen", 8840),
    ("expiratory_tidal_volume", 9571),
    ("white_blood_cells", 8510),
    ("platelets", 8510),
    ("hemoglobin", 8713),
    ("PEEP", 44777590),
    ("glasgow_coma_score", 0),
    ("glasgow_coma_score_eye", 0),
    ("glasgow_coma_score_motor", 0),
    ("glasgow_coma_score_verbal", 0),
    ("ventilator_mode", 0),
];

/// Label-table covariates that are also exported as measurements
pub const ADMISSION_VARIABLES: &[&str] = &["raw_height", "raw_weight"];

/// Time-series variables exported as measurements
pub const TIMESERIES_VARIABLES: &[&str] = &[
    "heart_rate",
    "invasive_systolic_blood_pressure",
    "invasive_diastolic_blood_pressure",
    "invasive_mean_blood_pressure",
    "noninvasive_systolic_blood_pressure",
    "noninvasive_diastolic_blood_pressure",
    "noninvasive_mean_blood_pressure",
    "O2_pulseoxymetry_saturation",
    "O2_arterial_saturation",
    "lactate",
    "blood_glucose",
    "magnesium",
    "sodium",
    "creatinine",
    "calcium",
    "temperature",
    "FiO2",
    "hemoglobin",
    "chloride",
    "pH",
    "paO2",
    "paCO2",
    "plateau_pressure",
    "respiratory_rate_setting",
    "tidal_volume_setting",
    "potassium",
    "PTT",
    "bilirubine",
    "alanine_aminotransferase",
    "aspartate_aminotransferase",
    "respiratory_rate",
    "albumin",
    "blood_urea_nitrogen",
    "expiratory_tidal_volume",
    "white_blood_cells",
    "platelets",
    "phosphate",
    "bicarbonate",
    "alkaline_phosphatase",
    "PEEP",
    "urine_output",
    "glasgow_coma_score",
    "glasgow_coma_score_eye",
    "glasgow_coma_score_motor",
    "glasgow_coma_score_verbal",
];

/// Concepts of the admission covariates when exported as measurements
pub const OBSERVATION_VARIABLE_CONCEPTS: &[(&str, i32)] =
    &[("raw_height", 607590), ("raw_weight", 4099154)];

/// Concepts describing the flat admission covariates (age, weight, height)
pub const FLAT_CONCEPT_IDS: &[i32] = &[4265453, 4099154, 607590];

/// Concepts of the binned OBSERVATION covariates
pub const OBSERVATION_CONCEPT_IDS: &[i32] = &[44804452, 3711521, 607590];

/// Fixed concepts referenced by the generated tables
pub const MISC_CONCEPT_IDS: &[i32] = &[
    VISIT_CONCEPT_ID,
    9203,
    4021813,
    VISIT_TYPE_CONCEPT_ID,
    OBSERVATION_TYPE_CONCEPT_ID,
    DRUG_TYPE_CONCEPT_ID,
    4318944,
    40481392,
    4149943,
    4305366,
    763903,
    4148496,
    4160026,
    SWITZERLAND_CONCEPT_ID,
    NETHERLANDS_CONCEPT_ID,
    UNITED_STATES_CONCEPT_ID,
];

/// CDM domains listed in the DOMAIN table with their domain concept
pub const DOMAINS: &[(&str, i32)] = &[
    ("Visit", 8),
    ("Type Concept", 58),
    ("Observation", 27),
    ("Drug", 13),
    ("Unit", 16),
    ("Measurement", 21),
];

/// Harmonized admission origins and their visit-type key
pub const ADMISSION_ORIGINS: &[(&str, &str)] = &[
    ("Home", "home"),
    ("Other", "other"),
    ("Unknown", "unknown"),
    ("nursing department of the same hospital", "hospital"),
    ("emergency department of the same hospital", "emergency"),
    ("CCU/IC of the same hospital", "icu"),
    ("special/medium care from the same hospital", "hospital"),
    (
        "recovery from the same hospital (only in case of unplanned IC admission)",
        "operating_room",
    ),
    ("nursing department from other hospital", "hospital"),
    ("special/medium care from other hospital", "hospital"),
    ("CCU/IC from other hospital", "icu"),
    ("emergency department from other hospital", "emergency"),
    ("recovery from other hospital", "operating_room"),
    (
        "operating room from nuring ward of the same hospital",
        "operating_room",
    ),
    (
        "different location of the same hospital, transport by ambulance",
        "hospital",
    ),
    (
        "operating room from emergency department of the same hospital",
        "operating_room",
    ),
    ("Emergency Department", "emergency"),
    ("Operating Room", "operating_room"),
    ("Recovery Room", "operating_room"),
    ("Direct Admit", "direct_admit"),
    ("Floor", "hospital"),
    ("Other Hospital", "hospital"),
    ("Other ICU", "icu"),
    ("ICU", "icu"),
    ("Step-Down Unit (SDU)", "hospital"),
    ("Acute Care/Floor", "hospital"),
    ("Chest Pain Center", "emergency"),
    ("Observation", "hospital"),
    ("PACU", "operating_room"),
    ("Rehabilitation", "rehab"),
];

/// Harmonized ICU unit types and their visit-type key
pub const UNIT_TYPES: &[(&str, &str)] = &[
    ("ICU", "icu"),
    ("Med-Surg ICU", "medical_surgical_icu"),
    ("MICU", "medical_icu"),
    ("SICU", "surgical_icu"),
    ("CCU-CTICU", "cardiac_icu"),
    ("CTICU", "cardiac_icu"),
    ("CSICU", "cardiac_icu"),
    ("Cardiac ICU", "cardiac_icu"),
    ("Neuro ICU", "neuro_icu"),
    ("Trauma SICU", "trauma_icu"),
    ("Medical Intensive Care Unit (MICU)", "medical_icu"),
    ("Surgical Intensive Care Unit (SICU)", "surgical_icu"),
    ("Medical/Surgical Intensive Care Unit (MICU/SICU)", "medical_surgical_icu"),
    ("Cardiac Vascular Intensive Care Unit (CVICU)", "cardiac_icu"),
    ("Coronary Care Unit (CCU)", "cardiac_icu"),
    ("Neuro Surgical Intensive Care Unit (Neuro SICU)", "neuro_icu"),
    ("Trauma SICU (TSICU)", "trauma_icu"),
];

/// Source dataset tags and the country of the hospitals they come from
pub const DATASET_COUNTRIES: &[(&str, &str)] = &[
    ("amsterdam", "NL"),
    ("hirid", "CH"),
    ("mimic", "US"),
    ("mimic3", "US"),
    ("eicu", "US"),
];
