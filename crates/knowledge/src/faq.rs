use common::{FinanceError, FinanceResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Words this short are ignored when scoring a query
const MIN_KEYWORD_LEN: usize = 3;

/// Uma pergunta frequente da base de conhecimento
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Faq {
    pub id: u32,
    pub question: String,
    pub answer: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Faq {
    fn searchable_text(&self) -> String {
        format!("{} {} {}", self.question, self.answer, self.tags.join(" ")).to_lowercase()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaqMatch {
    pub faq: Faq,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaqAnswer {
    pub faq: Faq,
    /// score / (score + 2), in [0, 1)
    pub confidence: f64,
}

/// Partial update; `None` and empty values leave the field untouched
#[derive(Debug, Clone, Default)]
pub struct FaqUpdate {
    pub question: Option<String>,
    pub answer: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// База FAQ с поиском по ключевым словам и хранением в JSON
pub struct FaqManager {
    path: PathBuf,
    faqs: Vec<Faq>,
}

impl FaqManager {
    /// Открыть базу; отсутствующий или повреждённый файл заменяется примерами
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let faqs = match Self::load(&path) {
            Ok(Some(faqs)) => {
                info!(count = faqs.len(), path = %path.display(), "FAQs loaded");
                faqs
            }
            Ok(None) => {
                debug!(path = %path.display(), "FAQ file missing, using built-in entries");
                default_faqs()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to load FAQs, using built-in entries");
                default_faqs()
            }
        };
        Self { path, faqs }
    }

    /// In-memory base, useful when nothing should be written to disk
    pub fn with_faqs<P: AsRef<Path>>(path: P, faqs: Vec<Faq>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            faqs,
        }
    }

    fn load(path: &Path) -> FinanceResult<Option<Vec<Faq>>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        let faqs: Vec<Faq> = serde_json::from_str(&content)?;
        Ok(Some(faqs))
    }

    pub fn save(&self) -> FinanceResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&self.faqs)?;
        fs::write(&self.path, json)?;
        debug!(count = self.faqs.len(), path = %self.path.display(), "FAQs saved");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn all(&self) -> &[Faq] {
        &self.faqs
    }

    pub fn len(&self) -> usize {
        self.faqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faqs.is_empty()
    }

    /// Поиск по ключевым словам.
    ///
    /// The score of an entry is the number of occurrences of every query word
    /// (three characters or longer) in its question, answer and tags. Entries
    /// with a zero score are dropped; ties keep catalogue order.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<FaqMatch> {
        let query = query.to_lowercase();
        let keywords: BTreeSet<&str> = query
            .split_whitespace()
            .filter(|w| w.chars().count() >= MIN_KEYWORD_LEN)
            .collect();

        if keywords.is_empty() {
            return Vec::new();
        }

        let mut matches: Vec<FaqMatch> = self
            .faqs
            .iter()
            .map(|faq| {
                let text = faq.searchable_text();
                let score = keywords
                    .iter()
                    .map(|word| text.matches(word).count() as u32)
                    .sum();
                FaqMatch {
                    faq: faq.clone(),
                    score,
                }
            })
            .filter(|m| m.score > 0)
            .collect();

        matches.sort_by(|a, b| b.score.cmp(&a.score));
        matches.truncate(top_k);
        matches
    }

    pub fn best_answer(&self, query: &str) -> Option<FaqAnswer> {
        self.search(query, 1).into_iter().next().map(|m| {
            let score = m.score as f64;
            FaqAnswer {
                faq: m.faq,
                confidence: score / (score + 2.0),
            }
        })
    }

    pub fn get(&self, id: u32) -> Option<&Faq> {
        self.faqs.iter().find(|f| f.id == id)
    }

    pub fn add(
        &mut self,
        question: &str,
        answer: &str,
        category: &str,
        tags: Vec<String>,
    ) -> FinanceResult<Faq> {
        let id = self.faqs.iter().map(|f| f.id).max().unwrap_or(0) + 1;
        let faq = Faq {
            id,
            question: question.to_string(),
            answer: answer.to_string(),
            category: category.to_string(),
            tags,
        };
        self.faqs.push(faq.clone());
        self.save()?;
        info!(id, "FAQ added");
        Ok(faq)
    }

    pub fn update(&mut self, id: u32, update: FaqUpdate) -> FinanceResult<Faq> {
        let faq = self
            .faqs
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| FinanceError::NotFound(format!("FAQ {id}")))?;

        if let Some(question) = update.question.filter(|s| !s.is_empty()) {
            faq.question = question;
        }
        if let Some(answer) = update.answer.filter(|s| !s.is_empty()) {
            faq.answer = answer;
        }
        if let Some(category) = update.category.filter(|s| !s.is_empty()) {
            faq.category = category;
        }
        if let Some(tags) = update.tags.filter(|t| !t.is_empty()) {
            faq.tags = tags;
        }

        let updated = faq.clone();
        self.save()?;
        Ok(updated)
    }

    /// Returns `false` when no FAQ has this id.
    pub fn remove(&mut self, id: u32) -> FinanceResult<bool> {
        let before = self.faqs.len();
        self.faqs.retain(|f| f.id != id);
        if self.faqs.len() == before {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    /// One entry per category ignoring case; the first spelling seen wins
    pub fn categories(&self) -> Vec<String> {
        let mut seen: BTreeMap<String, String> = BTreeMap::new();
        for faq in &self.faqs {
            seen.entry(faq.category.to_lowercase())
                .or_insert_with(|| faq.category.clone());
        }
        seen.into_values().collect()
    }

    /// Case-insensitive, Unicode aware (`CARTÕES` == `Cartões`)
    pub fn by_category(&self, category: &str) -> Vec<&Faq> {
        let category = category.to_lowercase();
        self.faqs
            .iter()
            .filter(|f| f.category.to_lowercase() == category)
            .collect()
    }
}

fn faq(id: u32, question: &str, answer: &str, category: &str, tags: &[&str]) -> Faq {
    Faq {
        id,
        question: question.to_string(),
        answer: answer.to_string(),
        category: category.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

/// Встроенные примеры для первой инициализации
pub fn default_faqs() -> Vec<Faq> {
    vec![
        faq(
            1,
            "Como funciona o Pix?",
            "O Pix é um meio de pagamento instantâneo criado pelo Banco Central. Permite transferências 24/7 em até 10 segundos, usando chaves como CPF, telefone, email ou chave aleatória.",
            "Pagamentos",
            &["pix", "transferência", "pagamento"],
        ),
        faq(
            2,
            "Qual é a taxa de juros da poupança?",
            "A poupança rende 70% da taxa Selic quando esta estiver acima de 8,5% ao ano, mais TR (Taxa Referencial). Quando a Selic estiver igual ou abaixo de 8,5% ao ano, a poupança rende 0,5% ao mês mais TR.",
            "Investimentos",
            &["poupança", "rendimento", "taxa"],
        ),
        faq(
            3,
            "Como aumentar o limite do cartão de crédito?",
            "Para solicitar aumento de limite: 1) Acesse o app do banco, 2) Vá em Cartões, 3) Selecione 'Aumentar limite', 4) Informe o valor desejado. A análise é automática e leva até 24h.",
            "Cartões",
            &["cartão", "limite", "crédito"],
        ),
        faq(
            4,
            "O que é Tesouro Direto?",
            "Tesouro Direto é um programa do Tesouro Nacional para venda de títulos públicos a pessoas físicas pela internet. É um investimento seguro, com rentabilidade garantida e aplicação mínima de R$ 30.",
            "Investimentos",
            &["tesouro direto", "investimento", "títulos públicos"],
        ),
        faq(
            5,
            "Como cancelar um cartão de crédito?",
            "Para cancelar: 1) Quite todas as faturas pendentes, 2) Entre em contato com o banco pelo app, telefone ou agência, 3) Solicite o cancelamento, 4) Guarde o protocolo. O cartão será cancelado em até 5 dias úteis.",
            "Cartões",
            &["cartão", "cancelamento"],
        ),
    ]
}
