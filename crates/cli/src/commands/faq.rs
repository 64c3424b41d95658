use crate::output;
use crate::AppContext;
use anyhow::Result;
use clap::{Args, Subcommand};
use colored::*;
use knowledge::{FaqManager, FaqUpdate};
use prettytable::row;

#[derive(Debug, Args)]
pub struct FaqCommand {
    #[command(subcommand)]
    command: FaqSubcommand,
}

#[derive(Debug, Clone, Subcommand)]
enum FaqSubcommand {
    /// Buscar a melhor resposta para uma pergunta
    #[command(name = "search")]
    Search {
        query: String,

        /// Quantidade de resultados
        #[arg(short = 'k', long, default_value_t = 3)]
        top_k: usize,
    },
    /// Listar FAQs (opcionalmente de uma categoria)
    #[command(name = "list")]
    List {
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Listar categorias
    #[command(name = "categories")]
    Categories,
    /// Mostrar uma FAQ pelo id
    #[command(name = "show")]
    Show { id: u32 },
    /// Adicionar nova FAQ
    #[command(name = "add")]
    Add {
        question: String,
        answer: String,

        #[arg(short, long, default_value = "geral")]
        category: String,

        /// Tags separadas por vírgula
        #[arg(short, long)]
        tags: Option<String>,
    },
    /// Atualizar campos de uma FAQ
    #[command(name = "update")]
    Update {
        id: u32,
        #[arg(long)]
        question: Option<String>,
        #[arg(long)]
        answer: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        tags: Option<String>,
    },
    /// Remover uma FAQ
    #[command(name = "remove")]
    Remove { id: u32 },
}

fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

impl FaqCommand {
    pub async fn execute(self, ctx: &AppContext) -> Result<()> {
        let mut manager = ctx.open_faqs();
        handle(&mut manager, self.command)
    }
}

fn handle(manager: &mut FaqManager, cmd: FaqSubcommand) -> Result<()> {
    match cmd {
        FaqSubcommand::Search { query, top_k } => {
            let Some(best) = manager.best_answer(&query) else {
                output::failure("Não encontrei uma resposta específica para sua pergunta.");
                println!(
                    "  {}",
                    "Tente reformular ou use `finassist chat` para falar com o assistente."
                        .dimmed()
                );
                return Ok(());
            };

            println!("{} {}", "?".cyan().bold(), best.faq.question.bold());
            println!("{}", best.faq.answer);
            println!(
                "  {} {}  {} {}",
                "categoria:".dimmed(),
                best.faq.category,
                "confiança:".dimmed(),
                output::percent(best.confidence * 100.0)
            );

            let related: Vec<_> = manager
                .search(&query, top_k)
                .into_iter()
                .filter(|m| m.faq.id != best.faq.id)
                .collect();
            if !related.is_empty() {
                output::header("Perguntas relacionadas:");
                for m in related {
                    println!("  [{}] {} {}", m.faq.id, m.faq.question, format!("(score {})", m.score).dimmed());
                }
            }
        }
        FaqSubcommand::List { category } => {
            let faqs = match &category {
                Some(c) => manager.by_category(c),
                None => manager.all().iter().collect(),
            };
            if faqs.is_empty() {
                output::failure("Nenhuma FAQ encontrada");
                return Ok(());
            }
            let mut table = output::new_table();
            table.set_titles(row!["ID", "Categoria", "Pergunta", "Tags"]);
            for faq in faqs {
                table.add_row(row![faq.id, faq.category, faq.question, faq.tags.join(", ")]);
            }
            table.printstd();
        }
        FaqSubcommand::Categories => {
            for category in manager.categories() {
                let count = manager.by_category(&category).len();
                println!("- {} {}", category.bold(), format!("({count})").dimmed());
            }
        }
        FaqSubcommand::Show { id } => match manager.get(id) {
            Some(faq) => {
                println!("{} {}", format!("[{}]", faq.id).cyan(), faq.question.bold());
                println!("{}", faq.answer);
                output::field("categoria", &faq.category);
                output::field("tags", faq.tags.join(", "));
            }
            None => output::failure(&format!("FAQ {id} não encontrada")),
        },
        FaqSubcommand::Add {
            question,
            answer,
            category,
            tags,
        } => {
            let tags = tags.as_deref().map(split_tags).unwrap_or_default();
            let faq = manager.add(&question, &answer, &category, tags)?;
            output::success(&format!("FAQ {} adicionada", faq.id));
        }
        FaqSubcommand::Update {
            id,
            question,
            answer,
            category,
            tags,
        } => {
            let update = FaqUpdate {
                question,
                answer,
                category,
                tags: tags.as_deref().map(split_tags),
            };
            let faq = manager.update(id, update)?;
            output::success(&format!("FAQ {} atualizada", faq.id));
        }
        FaqSubcommand::Remove { id } => {
            if manager.remove(id)? {
                output::success(&format!("FAQ {id} removida"));
            } else {
                output::failure(&format!("FAQ {id} não encontrada"));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_tags_normalises() {
        assert_eq!(split_tags(" PIX, transferência ,,"), vec!["pix", "transferência"]);
    }

    #[test]
    fn test_add_and_remove_through_handler() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = FaqManager::open(dir.path().join("faqs.json"));
        let before = manager.len();

        handle(
            &mut manager,
            FaqSubcommand::Add {
                question: "Como investir em Tesouro Direto?".into(),
                answer: "Pelo app, na área de investimentos.".into(),
                category: "investimentos".into(),
                tags: Some("tesouro, investimento".into()),
            },
        )
        .unwrap();
        assert_eq!(manager.len(), before + 1);

        let id = manager.all().last().unwrap().id;
        handle(&mut manager, FaqSubcommand::Remove { id }).unwrap();
        assert_eq!(manager.len(), before);
    }
}
