use assert_cmd::prelude::*;
use mockito::{Matcher, Server};
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

/// Binary isolated from the developer's config, `.env` and data files
fn cmd_in_temp_dir() -> (Command, TempDir) {
    let temp = TempDir::new().expect("temp dir");
    let mut cmd = Command::cargo_bin("finassist").unwrap();
    cmd.current_dir(temp.path());
    cmd.env("HOME", temp.path());
    cmd.env("NO_COLOR", "1");
    cmd.env("FINASSIST_DATA_DIR", temp.path().join("data"));
    cmd.env_remove("OPENAI_API_KEY");
    cmd.env_remove("FINASSIST_LLM_PROVIDER");
    (cmd, temp)
}

fn cmd_in(temp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("finassist").unwrap();
    cmd.current_dir(temp.path());
    cmd.env("HOME", temp.path());
    cmd.env("NO_COLOR", "1");
    cmd.env("FINASSIST_DATA_DIR", temp.path().join("data"));
    cmd
}

fn session_files(dir: &Path) -> Vec<std::path::PathBuf> {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
                .collect()
        })
        .unwrap_or_default()
}

fn completion(content: &str) -> String {
    serde_json::json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    })
    .to_string()
}

#[test]
fn calc_price_loan_reports_fixed_installment() {
    let (mut cmd, _temp) = cmd_in_temp_dir();
    cmd.args(["calc", "loan", "100000", "12", "360", "--system", "price"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Financiamento PRICE"))
        .stdout(predicate::str::contains("R$ 1.028,61"));
}

#[test]
fn calc_json_output_is_machine_readable() {
    let (mut cmd, _temp) = cmd_in_temp_dir();
    cmd.args(["calc", "loan", "12000", "0", "12", "-s", "sac", "--json"]);

    let output = cmd.assert().success().get_output().stdout.clone();
    let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(value["system"], "SAC");
    assert_eq!(value["installments"].as_array().unwrap().len(), 12);
}

#[test]
fn calc_json_stays_parseable_when_saved() {
    let (mut cmd, _temp) = cmd_in_temp_dir();
    cmd.args(["calc", "--json", "--save", "fv", "1000", "10", "2"]);

    let assert = cmd.assert().success();
    let out = assert.get_output();
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert!(value.is_number() || value.is_object());
    assert!(String::from_utf8_lossy(&out.stderr).contains("salva para"));
}

#[test]
fn analyze_json_without_data_prints_null() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("empty.json"), "[]").unwrap();

    for sub in ["summary", "kpis"] {
        let assert = cmd_in(&temp)
            .args(["analyze", sub, "--file", "empty.json", "--json"])
            .assert()
            .success();
        let value: serde_json::Value =
            serde_json::from_slice(&assert.get_output().stdout).unwrap();
        assert!(value.is_null());
    }
}

#[test]
fn out_of_range_horizons_fail_cleanly() {
    let (mut cmd, _temp) = cmd_in_temp_dir();
    cmd.args(["calc", "loan", "100000", "12", "4000000000"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("must not exceed"));

    let (mut cmd, _temp) = cmd_in_temp_dir();
    cmd.args(["calc", "plan", "0", "400000000", "5000"]);
    cmd.assert().failure();

    let (mut cmd, _temp) = cmd_in_temp_dir();
    cmd.args(["analyze", "summary", "--months", "4000000"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("must not exceed"));
}

#[test]
fn calc_rejects_invalid_input() {
    let (mut cmd, _temp) = cmd_in_temp_dir();
    cmd.args(["calc", "purchase", "100000", "150000", "120", "10"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Down payment"));
}

#[test]
fn calc_irr_accepts_negative_flows() {
    let (mut cmd, _temp) = cmd_in_temp_dir();
    cmd.args(["calc", "irr", "-1000", "1100"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("TIR"))
        .stdout(predicate::str::contains("10,00%"));
}

#[test]
fn saved_simulation_shows_up_in_history() {
    let temp = TempDir::new().unwrap();

    cmd_in(&temp)
        .args(["calc", "invest", "1000", "12", "24", "-c", "100", "--save", "--user", "ana"])
        .assert()
        .success()
        .stdout(predicate::str::contains("salva para ana"));

    cmd_in(&temp)
        .args(["history", "sims", "--user", "ana"])
        .assert()
        .success()
        .stdout(predicate::str::contains("investment"));
}

#[test]
fn validate_cpf() {
    let (mut cmd, _temp) = cmd_in_temp_dir();
    cmd.args(["validate", "cpf", "52998224725"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("CPF válido: 529.982.247-25"));

    let (mut cmd, _temp) = cmd_in_temp_dir();
    cmd.args(["validate", "cpf", "111.111.111-11"]);
    cmd.assert().failure();
}

#[test]
fn faq_search_uses_seeded_knowledge_base() {
    let (mut cmd, _temp) = cmd_in_temp_dir();
    cmd.args(["faq", "search", "como funciona o pix"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Como funciona o Pix?"))
        .stdout(predicate::str::contains("Banco Central"));
}

#[test]
fn faq_add_persists_between_runs() {
    let temp = TempDir::new().unwrap();

    cmd_in(&temp)
        .args([
            "faq",
            "add",
            "Como emitir boleto?",
            "Pelo app, em Pagamentos > Boletos.",
            "--category",
            "Pagamentos",
            "--tags",
            "boleto",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("FAQ 6 adicionada"));

    cmd_in(&temp)
        .args(["faq", "list", "--category", "pagamentos"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Como emitir boleto?"));
}

#[test]
fn products_show_and_unknown() {
    let (mut cmd, _temp) = cmd_in_temp_dir();
    cmd.args(["products", "show", "cdb"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("CDB Bradesco"))
        .stdout(predicate::str::contains("Garantia do FGC"));

    let (mut cmd, _temp) = cmd_in_temp_dir();
    cmd.args(["products", "search", "criptomoeda"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Nenhum produto encontrado"));
}

#[test]
fn analyze_sample_roundtrip_through_csv() {
    let temp = TempDir::new().unwrap();

    cmd_in(&temp)
        .args(["analyze", "sample", "tx.csv", "--seed", "7", "--months", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tx.csv"));

    cmd_in(&temp)
        .args(["analyze", "summary", "--file", "tx.csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Resumo financeiro"));

    cmd_in(&temp)
        .args(["analyze", "kpis", "--file", "tx.csv", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"median\""));
}

#[test]
fn analyze_missing_file_fails() {
    let (mut cmd, _temp) = cmd_in_temp_dir();
    cmd.args(["analyze", "summary", "--file", "nope.json"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("nope.json"));
}

#[test]
fn chat_without_api_key_fails_cleanly() {
    let (mut cmd, _temp) = cmd_in_temp_dir();
    cmd.args(["chat", "Olá"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("API key"));
}

#[test]
fn history_feedback_and_forget() {
    let temp = TempDir::new().unwrap();

    cmd_in(&temp)
        .args(["history", "feedback", "7"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("between 1 and 5"));

    cmd_in(&temp)
        .args(["history", "feedback", "4", "-c", "ótimo"])
        .assert()
        .success();

    cmd_in(&temp)
        .args(["history", "stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("4.00"));

    cmd_in(&temp)
        .args(["history", "forget"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--yes"));

    cmd_in(&temp)
        .args(["history", "forget", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("default_user"));
}

#[test]
fn invalid_environment_override_is_rejected() {
    let (mut cmd, _temp) = cmd_in_temp_dir();
    cmd.env("FINASSIST_TEMPERATURE", "5");
    cmd.args(["products", "list"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Temperature"));
}

#[test]
fn config_init_and_show() {
    let temp = TempDir::new().unwrap();

    cmd_in(&temp)
        .args(["config", "init"])
        .assert()
        .success();
    assert!(temp.path().join("finassist.toml").exists());

    cmd_in(&temp)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("finassist.toml"))
        .stdout(predicate::str::contains("[llm]"));
}

#[test]
fn chat_turns_are_stored_and_resumed() {
    let temp = TempDir::new().unwrap();
    let mut server = Server::new();

    let first = server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::Regex("Quanto rende a poupança".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion("Cerca de 0,5% ao mês."))
        .expect(1)
        .create();

    let url = server.url();
    let chat = |message: &str| {
        let mut cmd = cmd_in(&temp);
        cmd.env("FINASSIST_LLM_PROVIDER", "local")
            .env("LOCAL_LLM_URL", &url)
            .args(["chat", message, "--session", "s1", "--user", "ana"]);
        cmd
    };

    chat("Quanto rende a poupança?")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cerca de 0,5% ao mês."));
    first.assert();
    first.remove();

    cmd_in(&temp)
        .args(["history", "show", "--user", "ana", "--session", "s1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Quanto rende a poupança?"))
        .stdout(predicate::str::contains("Cerca de 0,5% ao mês."));

    let sessions = temp.path().join("data").join("sessions");
    assert_eq!(session_files(&sessions).len(), 1);

    // the resumed session must replay the stored turns to the provider
    let resumed = server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex("Quanto rende a poupança".into()),
            Matcher::Regex("Cerca de 0,5% ao mês".into()),
            Matcher::Regex("E o CDB".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion("O CDB costuma render mais."))
        .expect(1)
        .create();

    chat("E o CDB?")
        .assert()
        .success()
        .stdout(predicate::str::contains("O CDB costuma render mais."));
    resumed.assert();
}

#[test]
fn failed_chat_turn_stores_nothing() {
    let temp = TempDir::new().unwrap();
    let mut server = Server::new();
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(500)
        .with_body("boom")
        .create();

    cmd_in(&temp)
        .env("FINASSIST_LLM_PROVIDER", "local")
        .env("LOCAL_LLM_URL", server.url())
        .args(["chat", "Olá"])
        .assert()
        .failure();

    cmd_in(&temp)
        .args(["history", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nenhuma mensagem"));
    assert!(session_files(&temp.path().join("data").join("sessions")).is_empty());
}

#[test]
fn forget_removes_session_snapshots() {
    let temp = TempDir::new().unwrap();
    let sessions = temp.path().join("data").join("sessions");
    fs::create_dir_all(&sessions).unwrap();
    let snapshot = |user: &str| {
        serde_json::json!({
            "user_id": user,
            "session_id": "s1",
            "session_start": "2024-06-30T12:00:00Z",
            "messages": [{
                "role": "user",
                "content": "meu salário é 5000",
                "timestamp": "2024-06-30T12:00:01Z"
            }]
        })
        .to_string()
    };
    fs::write(sessions.join("ana_20240630_120000.json"), snapshot("ana")).unwrap();
    fs::write(sessions.join("bob_20240630_120000.json"), snapshot("bob")).unwrap();

    cmd_in(&temp)
        .args(["history", "forget", "--yes", "--user", "ana"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 sessões salvas"));

    assert!(!sessions.join("ana_20240630_120000.json").exists());
    assert!(sessions.join("bob_20240630_120000.json").exists());
}

#[test]
fn broken_config_file_is_reported() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("finassist.toml"), "[llm\nprovider = ").unwrap();

    cmd_in(&temp)
        .args(["config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("finassist.toml"));

    cmd_in(&temp)
        .args(["products", "list"])
        .assert()
        .failure();

    // init --force still works so the file can be replaced
    cmd_in(&temp)
        .args(["config", "init", "--force"])
        .assert()
        .success();
    cmd_in(&temp)
        .args(["config", "validate"])
        .assert()
        .success();
}
