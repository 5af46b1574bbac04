use crate::processing::normalize_text;

/// Static description of one lead-scoring rule.
#[derive(Debug, Clone, Copy)]
pub struct RuleSpec {
    pub keywords: &'static [&'static str],
    pub delta: i64,
    pub reason: &'static str,
}

/// Built-in rule table for Spanish-speaking ISP sales conversations.
/// Accented and unaccented spellings are both listed; they normalize to the
/// same matcher and are de-duplicated at compile time.
pub const DEFAULT_RULES: &[RuleSpec] = &[
    RuleSpec {
        keywords: &[
            "precio", "cuanto", "cuánto", "vale", "sale", "costo", "coste", "tarifa", "valor",
            "abono", "mensual", "mensualidad", "cuota", "planes", "plan", "promo", "promocion",
            "promoción", "oferta", "descuento", "instalacion gratis", "instalación gratis",
            "forma de pago", "pago", "factura",
        ],
        delta: 2,
        reason: "Consulta comercial",
    },
    RuleSpec {
        keywords: &[
            "fibra", "fibra optica", "fibra óptica", "ftth", "velocidad", "megas", "mb", "gb",
            "subida", "bajada", "simetrico", "simétrico", "latencia", "ping", "wifi", "router",
            "onu", "ip publica", "ip pública", "publica", "pública", "se corta", "cortes",
            "microcortes", "intermitente", "netflix", "streaming", "jugar", "gaming",
        ],
        delta: 3,
        reason: "Interés técnico",
    },
    RuleSpec {
        keywords: &[
            "cobertura", "zona", "barrio", "localidad", "ciudad", "llega", "llegan", "llegaria",
            "llegaría", "direccion", "dirección", "domicilio", "calle", "altura", "manzana",
            "lote", "ubicacion", "ubicación", "maps", "google maps", "disponibilidad", "cupo",
            "instalan en", "instalar en",
        ],
        delta: 4,
        reason: "Consulta de cobertura",
    },
    RuleSpec {
        keywords: &[
            "instalacion", "instalación", "instalar", "instalan", "cuando instalan",
            "cuando pueden", "cuanto tardan", "cuánto tardan", "turno", "fecha", "horario",
            "tecnico", "técnico", "visita",
        ],
        delta: 4,
        reason: "Interés en instalación",
    },
    RuleSpec {
        keywords: &[
            "quiero", "me interesa", "lo quiero", "quiero contratar", "me interesa contratar",
            "contratar", "alta", "dar de alta", "activar", "activacion", "activación",
            "pasame los datos", "pasame info", "pásame info", "confirmo", "dale", "ok", "joya",
        ],
        delta: 6,
        reason: "Intención de contratación",
    },
    RuleSpec {
        keywords: &["urgente", "lo antes posible", "ya", "hoy", "mañana", "esta semana"],
        delta: 3,
        reason: "Urgencia",
    },
    RuleSpec {
        keywords: &[
            "satelite", "satélite", "starlink", "star link", "rural", "campo", "zona rural",
        ],
        delta: 3,
        reason: "Interés satelital",
    },
    RuleSpec {
        keywords: &[
            "comparar", "otra empresa", "movistar", "personal", "claro", "telecom", "iplan",
            "telecentro", "flow", "directv", "direc tv",
        ],
        delta: 1,
        reason: "Comparación con competencia",
    },
    // A bare "no" is deliberately absent: it appears in almost every chat.
    RuleSpec {
        keywords: &[
            "muy caro", "carisimo", "carísimo", "no me sirve", "no quiero", "no puedo",
            "por ahora no", "mas adelante", "más adelante", "despues veo", "después veo",
            "luego veo", "ya tengo", "ya cuento con",
        ],
        delta: -4,
        reason: "Objeción",
    },
    RuleSpec {
        keywords: &[
            "no gracias", "cancelar", "baja", "dar de baja", "no me interesa", "olvidate",
            "olvídate", "no molesten", "stop", "spam", "no quiero el servicio", "no me sirve",
        ],
        delta: -8,
        reason: "Rechazo definitivo",
    },
];

/// A keyword compiled against normalized text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeywordMatcher {
    /// Several words: normalized substring.
    Phrase(String),
    /// One word: must be a whole token, so `plan` stays out of `planeando`.
    Word(String),
}

impl KeywordMatcher {
    /// `None` when the keyword normalizes to nothing.
    pub fn compile(keyword: &str) -> Option<Self> {
        let normalized = normalize_text(keyword);
        if normalized.is_empty() {
            None
        } else if normalized.contains(' ') {
            Some(Self::Phrase(normalized))
        } else {
            Some(Self::Word(normalized))
        }
    }

    /// `text` must already be normalized.
    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Self::Phrase(phrase) => text.contains(phrase.as_str()),
            Self::Word(word) => text.split(' ').any(|token| token == word),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScoringRule {
    pub reason: String,
    pub delta: i64,
    matchers: Vec<KeywordMatcher>,
}

impl ScoringRule {
    pub fn new<I, S>(keywords: I, delta: i64, reason: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut matchers: Vec<KeywordMatcher> = Vec::new();
        for matcher in keywords
            .into_iter()
            .filter_map(|k| KeywordMatcher::compile(k.as_ref()))
        {
            if !matchers.contains(&matcher) {
                matchers.push(matcher);
            }
        }
        Self {
            reason: reason.into(),
            delta,
            matchers,
        }
    }

    pub fn matchers(&self) -> &[KeywordMatcher] {
        &self.matchers
    }

    pub fn matches(&self, normalized_text: &str) -> bool {
        self.matchers.iter().any(|m| m.is_match(normalized_text))
    }
}

/// Ordered, immutable rule set. Build once and share.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<ScoringRule>,
}

impl RuleTable {
    pub fn new(rules: Vec<ScoringRule>) -> Self {
        Self { rules }
    }

    pub fn from_specs(specs: &[RuleSpec]) -> Self {
        Self::new(
            specs
                .iter()
                .map(|spec| ScoringRule::new(spec.keywords.iter(), spec.delta, spec.reason))
                .collect(),
        )
    }

    pub fn rules(&self) -> &[ScoringRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::from_specs(DEFAULT_RULES)
    }
}
