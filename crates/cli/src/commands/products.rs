use crate::output;
use anyhow::Result;
use clap::{Args, Subcommand};
use colored::*;
use knowledge::{Product, ProductCatalog};
use prettytable::row;

#[derive(Debug, Args)]
pub struct ProductsCommand {
    #[command(subcommand)]
    command: ProductsSubcommand,
}

#[derive(Debug, Clone, Subcommand)]
enum ProductsSubcommand {
    /// Listar produtos
    #[command(name = "list")]
    List {
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Buscar por nome, descrição ou categoria
    #[command(name = "search")]
    Search { term: String },
    /// Detalhes de um produto
    #[command(name = "show")]
    Show { id: String },
}

impl ProductsCommand {
    pub async fn execute(self) -> Result<()> {
        let catalog = ProductCatalog::new();

        match self.command {
            ProductsSubcommand::List { category } => {
                let products = match &category {
                    Some(c) => catalog.by_category(c),
                    None => catalog.all().iter().collect(),
                };
                print_table(&products);
            }
            ProductsSubcommand::Search { term } => {
                let products = catalog.search(&term);
                print_table(&products);
            }
            ProductsSubcommand::Show { id } => match catalog.get(&id) {
                Some(product) => print_product(product),
                None => output::failure(&format!("Produto '{id}' não encontrado")),
            },
        }
        Ok(())
    }
}

fn print_table(products: &[&Product]) {
    if products.is_empty() {
        output::failure("Nenhum produto encontrado");
        return;
    }
    let mut table = output::new_table();
    table.set_titles(row!["ID", "Produto", "Categoria", "Público"]);
    for p in products {
        table.add_row(row![p.id, p.name, p.category, p.target_audience]);
    }
    table.printstd();
}

fn print_product(product: &Product) {
    println!("{} {}", "●".cyan(), product.name.bold());
    println!("{}", product.description);
    output::field("categoria", &product.category);
    output::field("público-alvo", &product.target_audience);
    output::header("Benefícios:");
    for feature in &product.features {
        println!("  - {}", feature);
    }
}
