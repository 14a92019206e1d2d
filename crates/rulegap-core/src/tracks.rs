//! Track catalog: the fixed business categories rules are mapped against.
//!
//! A [`TrackCatalog`] is a versioned, read-only snapshot loaded once per
//! process and passed explicitly into each run. Administrative changes
//! produce a new snapshot; a running analysis never observes mutation.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::Severity;

/// A single baseline rule within a track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackRule {
    pub rule_id: String,
    pub description: String,
    /// Explicit priority; when set, a `missing` gap for this rule inherits
    /// the higher of this and the default severity.
    #[serde(default)]
    pub priority: Option<Severity>,
}

impl TrackRule {
    fn new(rule_id: &str, description: &str) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            description: description.to_string(),
            priority: None,
        }
    }
}

/// One subtopic of a track, phrased in both working languages. Each subtopic
/// becomes one retrieval query per language so that a single broad query does
/// not starve the others of top-k slots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtopic {
    pub ar: String,
    pub en: String,
}

impl Subtopic {
    fn new(ar: &str, en: &str) -> Self {
        Self {
            ar: ar.to_string(),
            en: en.to_string(),
        }
    }
}

/// A business track: bilingual identity, retrieval subtopics, mapping
/// keywords, and the baseline rule catalog extracted documents are compared
/// against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialTrack {
    pub track_id: String,
    pub name_ar: String,
    pub name_en: String,
    pub definition_ar: String,
    pub definition_en: String,
    pub subtopics: Vec<Subtopic>,
    /// Lexical anchors used by the keyword mapper and the affinity check.
    pub keywords: Vec<String>,
    pub current_rules: Vec<TrackRule>,
}

impl FinancialTrack {
    /// Look up a baseline rule by id.
    pub fn baseline_rule(&self, rule_id: &str) -> Option<&TrackRule> {
        self.current_rules.iter().find(|r| r.rule_id == rule_id)
    }
}

/// Versioned, read-only track catalog snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackCatalog {
    pub version: u32,
    pub tracks: Vec<FinancialTrack>,
}

impl TrackCatalog {
    /// Parse a catalog from JSON produced by the administrative layer.
    ///
    /// An empty track list is valid (a run against it yields no queries and
    /// no gaps); a track with an empty id is not.
    pub fn from_json(json: &str) -> Result<Self> {
        let catalog: TrackCatalog =
            serde_json::from_str(json).context("Failed to parse track catalog JSON")?;
        for track in &catalog.tracks {
            if track.track_id.is_empty() {
                bail!("Track catalog contains a track with an empty id");
            }
        }
        Ok(catalog)
    }

    pub fn get(&self, track_id: &str) -> Option<&FinancialTrack> {
        self.tracks.iter().find(|t| t.track_id == track_id)
    }

    pub fn track_ids(&self) -> Vec<&str> {
        self.tracks.iter().map(|t| t.track_id.as_str()).collect()
    }

    /// The built-in catalog: contracts, salaries, and invoices, with the
    /// baseline verification rules currently enforced for each.
    pub fn builtin() -> Self {
        Self {
            version: 1,
            tracks: vec![
                FinancialTrack {
                    track_id: "contracts".to_string(),
                    name_ar: "العقود".to_string(),
                    name_en: "Contracts".to_string(),
                    definition_ar: "يشمل أوامر دفع بناءً على نسبة إنجاز أو معلم محدد ضمن العقد، ويخضع للأنظمة مثل نظام المنافسات والمشتريات، تعليمات تنفيذ الميزانية، نظام استئجار العقار، وأوامر سامية".to_string(),
                    definition_en: "Payment orders based on completion percentage or contract milestones, governed by the Competition and Procurement Law, Budget Execution Instructions, Real Estate Leasing Law, and Royal Orders".to_string(),
                    subtopics: vec![
                        Subtopic::new("العقود والمستخلصات ومراحلها", "contracts and completion certificates"),
                        Subtopic::new("الترسية والمنافسات والمشتريات", "award procedures, competition and procurement"),
                        Subtopic::new("محاضر تسليم المواقع وبدء الأعمال", "site handover and commencement of works"),
                    ],
                    keywords: vec![
                        "عقد", "مستخلص", "ترسية", "منافسات", "مشتريات", "إنشاءات", "مقاول",
                        "contract", "certificate", "award", "procurement", "tender", "contractor",
                    ]
                    .into_iter()
                    .map(String::from)
                    .collect(),
                    current_rules: vec![
                        TrackRule::new(
                            "CON-001",
                            "وجود مستخلص يعكس مرحلته (أولي/جاري/ختامي) ومطابق لبيانات العقد وجدول الدفعات",
                        ),
                        TrackRule::new(
                            "CON-002",
                            "في حالة المستخلص الختامي، يجب ألا تقل نسبته عن %10 من إجمالي قيمة العقد لعقود الإنشاءات العامة و %5 من العقود الأخرى",
                        ),
                        TrackRule::new(
                            "CON-003",
                            "التحقق من سلامة إجراءات الترسية وأنها تمت وفقا لنظام المنافسات والمشتريات الحكومية والأنظمة والتعليمات ذات العلاقة وعدم وجود تحفظات في محضر لجنة فحص العروض",
                        ),
                        TrackRule::new("CON-004", "محضر تسليم الموقع أو بدء الأعمال"),
                    ],
                },
                FinancialTrack {
                    track_id: "salaries".to_string(),
                    name_ar: "الرواتب".to_string(),
                    name_en: "Salaries".to_string(),
                    definition_ar: "يشمل أوامر الدفع المتعلقة برواتب الموظفين، والبدلات، والمزايا الأخرى المرتبطة بالخدمة الحكومية".to_string(),
                    definition_en: "Payment orders for employee salaries, allowances, and other benefits associated with government service".to_string(),
                    subtopics: vec![
                        Subtopic::new("الرواتب الأساسية والدرجات الوظيفية", "base salary and pay grades"),
                        Subtopic::new("الحسميات والاستقطاعات من الراتب", "deductions from salary"),
                        Subtopic::new("البدلات والعمل الإضافي", "allowances and overtime assignments"),
                    ],
                    keywords: vec![
                        "راتب", "موظف", "حسميات", "بدل", "عمل إضافي", "درجة وظيفية",
                        "salary", "deduction", "allowance", "overtime", "payroll", "employee",
                    ]
                    .into_iter()
                    .map(String::from)
                    .collect(),
                    current_rules: vec![
                        TrackRule::new(
                            "SAL-001",
                            "التحقق من أن مجموع الحسميات لا يتجاوز ثلث الراتب الأساسي",
                        ),
                        TrackRule::new(
                            "SAL-002",
                            "التحقق من عدم اختلاف صافي راتب الفرد بما لا يتجاوز 3%",
                        ),
                        TrackRule::new(
                            "SAL-003",
                            "التحقق من أن الراتب الأساسي لكل موظف يتطابق مع الدرجة الوظيفية في السلم الرسمي",
                        ),
                        TrackRule::new(
                            "SAL-004",
                            "التحقق من وجود خطاب تكليف للعمل الإضافي يتضمن جميع التفاصيل",
                        ),
                    ],
                },
                FinancialTrack {
                    track_id: "invoices".to_string(),
                    name_ar: "الفواتير".to_string(),
                    name_en: "Invoices".to_string(),
                    definition_ar: "يشمل المطالبات الناتجة عن فواتير الكهرباء، المياه، الجوال، وغيرها المقدمة مقابل خدمات استهلاكية فعلية".to_string(),
                    definition_en: "Claims resulting from electricity, water, and mobile bills submitted for actual consumable services".to_string(),
                    subtopics: vec![
                        Subtopic::new("الفواتير والخدمات الاستهلاكية", "invoices for consumable services"),
                        Subtopic::new("التسعيرة الحكومية للشرائح", "government tariff brackets"),
                        Subtopic::new("تكرار الصرف ومطابقة المبالغ", "duplicate payment and amount matching"),
                    ],
                    keywords: vec![
                        "فاتورة", "كهرباء", "مياه", "جوال", "خدمات", "استهلاكية", "تسعيرة",
                        "invoice", "bill", "electricity", "water", "tariff", "utility",
                    ]
                    .into_iter()
                    .map(String::from)
                    .collect(),
                    current_rules: vec![
                        TrackRule::new("INV-001", "التحقق من عدم تكرار الصرف لنفس العملية"),
                        TrackRule::new(
                            "INV-002",
                            "التحقق من مطابقة المبالغ المراد صرفها مع الفواتير",
                        ),
                        TrackRule::new(
                            "INV-003",
                            "التحقق من أن الخدمة مرتبطة بجهة حكومية وليست بجهة خارجية",
                        ),
                        TrackRule::new("INV-004", "التحقق من مطابقتها لتسعيرة الشرائح الحكومية"),
                    ],
                },
            ],
        }
    }
}
