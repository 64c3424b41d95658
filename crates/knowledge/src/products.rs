use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category: String,
    pub description: String,
    pub features: Vec<String>,
    pub target_audience: String,
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.category)
    }
}

/// Каталог банковских продуктов
#[derive(Debug, Clone)]
pub struct ProductCatalog {
    products: Vec<Product>,
}

impl Default for ProductCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ProductCatalog {
    pub fn new() -> Self {
        Self {
            products: builtin_products(),
        }
    }

    pub fn from_products(products: Vec<Product>) -> Self {
        Self { products }
    }

    pub fn all(&self) -> &[Product] {
        &self.products
    }

    pub fn get(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn by_category(&self, category: &str) -> Vec<&Product> {
        let category = category.to_lowercase();
        self.products
            .iter()
            .filter(|p| p.category.to_lowercase() == category)
            .collect()
    }

    /// Case-insensitive substring match on name, description or category
    pub fn search(&self, term: &str) -> Vec<&Product> {
        let term = term.to_lowercase();
        self.products
            .iter()
            .filter(|p| {
                p.name.to_lowercase().contains(&term)
                    || p.description.to_lowercase().contains(&term)
                    || p.category.to_lowercase().contains(&term)
            })
            .collect()
    }

    pub fn categories(&self) -> Vec<String> {
        self.products
            .iter()
            .map(|p| p.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

fn product(
    id: &str,
    name: &str,
    category: &str,
    description: &str,
    features: [&str; 4],
    target_audience: &str,
) -> Product {
    Product {
        id: id.to_string(),
        name: name.to_string(),
        category: category.to_string(),
        description: description.to_string(),
        features: features.iter().map(|f| f.to_string()).collect(),
        target_audience: target_audience.to_string(),
    }
}

fn builtin_products() -> Vec<Product> {
    vec![
        product(
            "cc_prime",
            "Conta Corrente Prime",
            "Conta Corrente",
            "Conta completa com benefícios exclusivos e tarifas diferenciadas.",
            [
                "Cartão de crédito sem anuidade",
                "Transferências ilimitadas",
                "Assessoria financeira",
                "Seguros inclusos",
            ],
            "Alta renda",
        ),
        product(
            "poupanca",
            "Poupança Bradesco",
            "Investimentos",
            "Investimento seguro com liquidez diária e rendimento mensal.",
            [
                "Sem taxa de administração",
                "Liquidez diária",
                "Rendimento mensal",
                "Garantia do FGC até R$ 250.000",
            ],
            "Conservador",
        ),
        product(
            "cdb",
            "CDB Bradesco",
            "Investimentos",
            "Certificado de Depósito Bancário com rentabilidade atrativa.",
            [
                "Rentabilidade acima da poupança",
                "Diferentes prazos de vencimento",
                "Garantia do FGC",
                "Opções de liquidez",
            ],
            "Moderado",
        ),
        product(
            "credito_pessoal",
            "Crédito Pessoal",
            "Empréstimos",
            "Empréstimo com taxas competitivas e prazos flexíveis.",
            [
                "Até 60 meses para pagar",
                "Taxas competitivas",
                "Aprovação rápida",
                "Crédito de até R$ 50.000",
            ],
            "Geral",
        ),
        product(
            "consorcio",
            "Consórcio Bradesco",
            "Financiamentos",
            "Planejamento para aquisição de bens sem juros.",
            [
                "Sem juros",
                "Taxas de administração reduzidas",
                "Diversos segmentos (imóveis, veículos, serviços)",
                "Flexibilidade de prazos",
            ],
            "Planejador",
        ),
    ]
}
