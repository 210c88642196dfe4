//! Thin clap CLI over the `kyc_dsl_service` gRPC facades (spec.md §6.4):
//! each command maps to exactly one facade call and performs no business
//! logic of its own. Exit codes: 0 success, 2 validation failure, 3 store
//! error, 4 usage error.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::*;
use tonic::Request;

#[allow(dead_code, unused_imports, clippy::all)]
pub mod kyc {
    pub mod dsl {
        tonic::include_proto!("kyc.dsl");
    }
}

use kyc::dsl::case_store_service_client::CaseStoreServiceClient;
use kyc::dsl::dictionary_service_client::DictionaryServiceClient;
use kyc::dsl::dsl_service_client::DslServiceClient;
use kyc::dsl::ontology_service_client::OntologyServiceClient;
use kyc::dsl::*;

const EXIT_SUCCESS: u8 = 0;
const EXIT_VALIDATION_FAILURE: u8 = 2;
const EXIT_STORE_ERROR: u8 = 3;
const EXIT_USAGE_ERROR: u8 = 4;

#[derive(Parser)]
#[command(name = "kyc_cli")]
#[command(about = "KYC DSL gRPC client", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://[::1]:50060")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a DSL file into structured form
    Parse { file: String },
    /// Validate a DSL file against the ontology
    Validate {
        file: String,
        #[arg(long, default_value = "")]
        case_id: String,
    },
    /// Serialize a DSL file back to canonical text
    Serialize { file: String },
    /// Apply a named amendment step to a stored case
    Amend {
        #[arg(long)]
        case: String,
        #[arg(long)]
        step: String,
        #[arg(long, default_value = "CLI")]
        actor: String,
    },
    /// Execute a case's compiled instruction plan
    Execute {
        #[arg(long)]
        case: String,
        #[arg(long)]
        function: String,
    },
    /// Print the DSL grammar
    Grammar,
    /// List the named amendment steps the engine accepts
    Amendments,
    /// Get one specific case version
    Get {
        #[arg(long)]
        case: String,
        #[arg(long)]
        version: u64,
    },
    /// Get the latest version of a case
    Latest {
        #[arg(long)]
        case: String,
    },
    /// List every version of a case
    Versions {
        #[arg(long)]
        case: String,
    },
    /// List cases, optionally filtered
    List {
        #[arg(long, default_value = "")]
        status: String,
        #[arg(long, default_value = "")]
        prefix: String,
    },
    /// Get one attribute from the dictionary
    Attribute { code: String },
    /// List attributes, optionally filtered by class (public/private)
    Attributes {
        #[arg(long, default_value = "")]
        class: String,
    },
    /// Get one document from the dictionary
    Document { code: String },
    /// List every document
    Documents,
    /// List every regulation
    Regulations,
    /// List documents linked to a regulation
    DocumentsByRegulation { code: String },
    /// Get the catalogued derivations feeding a derived attribute
    Derivations { code: String },
    /// Walk an attribute's full derivation lineage
    Lineage { code: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{} {}", "error:".red(), e);
            ExitCode::from(EXIT_STORE_ERROR)
        }
    }
}

async fn run(cli: Cli) -> Result<u8, Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Parse { file } => parse(&cli.server, &file).await,
        Commands::Validate { file, case_id } => validate(&cli.server, &file, &case_id).await,
        Commands::Serialize { file } => serialize(&cli.server, &file).await,
        Commands::Amend { case, step, actor } => amend(&cli.server, &case, &step, &actor).await,
        Commands::Execute { case, function } => execute(&cli.server, &case, &function).await,
        Commands::Grammar => grammar(&cli.server).await,
        Commands::Amendments => amendments(&cli.server).await,
        Commands::Get { case, version } => get_version(&cli.server, &case, version).await,
        Commands::Latest { case } => latest_version(&cli.server, &case).await,
        Commands::Versions { case } => list_versions(&cli.server, &case).await,
        Commands::List { status, prefix } => list_cases(&cli.server, &status, &prefix).await,
        Commands::Attribute { code } => get_attribute(&cli.server, &code).await,
        Commands::Attributes { class } => list_attributes(&cli.server, &class).await,
        Commands::Document { code } => get_document(&cli.server, &code).await,
        Commands::Documents => list_documents(&cli.server).await,
        Commands::Regulations => list_regulations(&cli.server).await,
        Commands::DocumentsByRegulation { code } => documents_by_regulation(&cli.server, &code).await,
        Commands::Derivations { code } => get_derivations(&cli.server, &code).await,
        Commands::Lineage { code } => get_lineage(&cli.server, &code).await,
    }
}

fn read_file(path: &str) -> Result<String, Box<dyn std::error::Error>> {
    std::fs::read_to_string(path).map_err(|e| format!("cannot read {}: {}", path, e).into())
}

async fn parse(server: &str, file: &str) -> Result<u8, Box<dyn std::error::Error>> {
    let dsl = read_file(file)?;
    let mut client = DslServiceClient::connect(server.to_string()).await?;
    let response = client.parse(Request::new(ParseRequest { dsl })).await?.into_inner();

    if !response.success {
        println!("{} {}", "parse failed:".red(), response.errors.join("; "));
        return Ok(EXIT_USAGE_ERROR);
    }
    for case in response.cases {
        println!("{} {}", "case:".green(), case.name.bright_cyan());
        println!("  {} {}", "nature:".dimmed(), case.nature);
        println!("  {} {}", "purpose:".dimmed(), case.purpose);
        println!("  {} {}", "client-business-unit:".dimmed(), case.client_business_unit);
        println!("  {} {}", "kyc-token:".dimmed(), case.kyc_token);
    }
    Ok(EXIT_SUCCESS)
}

async fn validate(server: &str, file: &str, case_id: &str) -> Result<u8, Box<dyn std::error::Error>> {
    let dsl = read_file(file)?;
    let mut client = DslServiceClient::connect(server.to_string()).await?;
    let result = client
        .validate(Request::new(ValidateRequest {
            case_id: case_id.to_string(),
            dsl,
        }))
        .await?
        .into_inner();

    println!(
        "{} {}/{} checks passed",
        if result.valid { "PASS".green() } else { "FAIL".red() },
        result.checks_passed,
        result.checks_total
    );
    for issue in &result.issues {
        println!("  {} [{}] {}", issue.severity.yellow(), issue.code, issue.message);
    }

    Ok(if result.valid { EXIT_SUCCESS } else { EXIT_VALIDATION_FAILURE })
}

async fn serialize(server: &str, file: &str) -> Result<u8, Box<dyn std::error::Error>> {
    let dsl = read_file(file)?;
    let mut client = DslServiceClient::connect(server.to_string()).await?;
    let response = client
        .serialize(Request::new(SerializeRequest { dsl }))
        .await?
        .into_inner();

    if !response.success {
        println!("{} {}", "serialize failed:".red(), response.message);
        return Ok(EXIT_USAGE_ERROR);
    }
    println!("{}", response.dsl);
    Ok(EXIT_SUCCESS)
}

async fn amend(server: &str, case: &str, step: &str, actor: &str) -> Result<u8, Box<dyn std::error::Error>> {
    let mut client = DslServiceClient::connect(server.to_string()).await?;
    let response = client
        .amend(Request::new(AmendRequest {
            case_name: case.to_string(),
            step: step.to_string(),
            actor: actor.to_string(),
        }))
        .await?
        .into_inner();

    if !response.success {
        println!("{} {}", "amend failed:".red(), response.message);
        return Ok(EXIT_STORE_ERROR);
    }
    println!(
        "{} {} -> version {} ({})",
        "amended".green(),
        case.bright_cyan(),
        response.new_version,
        response.content_hash.dimmed()
    );
    Ok(EXIT_SUCCESS)
}

async fn execute(server: &str, case: &str, function: &str) -> Result<u8, Box<dyn std::error::Error>> {
    let mut client = DslServiceClient::connect(server.to_string()).await?;
    let response = client
        .execute(Request::new(ExecuteRequest {
            case_id: case.to_string(),
            function_name: function.to_string(),
        }))
        .await?
        .into_inner();

    if !response.success {
        println!("{} {}", "execute failed:".red(), response.message);
        return Ok(EXIT_STORE_ERROR);
    }
    println!("{}", response.result_json);
    Ok(EXIT_SUCCESS)
}

async fn grammar(server: &str) -> Result<u8, Box<dyn std::error::Error>> {
    let mut client = DslServiceClient::connect(server.to_string()).await?;
    let response = client.get_grammar(Request::new(GetGrammarRequest {})).await?.into_inner();
    println!("{} {}", "grammar version:".dimmed(), response.version);
    println!("{}", response.ebnf);
    Ok(EXIT_SUCCESS)
}

async fn amendments(server: &str) -> Result<u8, Box<dyn std::error::Error>> {
    let mut client = DslServiceClient::connect(server.to_string()).await?;
    let response = client
        .list_amendments(Request::new(ListAmendmentsRequest {}))
        .await?
        .into_inner();
    for a in response.amendments {
        println!("  {} {}", a.name.bright_cyan(), a.description.dimmed());
    }
    Ok(EXIT_SUCCESS)
}

async fn get_version(server: &str, case: &str, version: u64) -> Result<u8, Box<dyn std::error::Error>> {
    let mut client = CaseStoreServiceClient::connect(server.to_string()).await?;
    let response = client
        .get_case_version(Request::new(GetCaseVersionRequest {
            name: case.to_string(),
            version,
        }))
        .await?
        .into_inner();
    println!("{}", response.dsl_snapshot);
    Ok(EXIT_SUCCESS)
}

async fn latest_version(server: &str, case: &str) -> Result<u8, Box<dyn std::error::Error>> {
    let mut client = CaseStoreServiceClient::connect(server.to_string()).await?;
    let response = client
        .get_latest_case_version(Request::new(GetLatestCaseVersionRequest { name: case.to_string() }))
        .await?
        .into_inner();
    println!("{} {}", "version:".dimmed(), response.version);
    println!("{}", response.dsl_snapshot);
    Ok(EXIT_SUCCESS)
}

async fn list_versions(server: &str, case: &str) -> Result<u8, Box<dyn std::error::Error>> {
    let mut client = CaseStoreServiceClient::connect(server.to_string()).await?;
    let response = client
        .list_case_versions(Request::new(ListCaseVersionsRequest { name: case.to_string() }))
        .await?
        .into_inner();
    for version in response.versions {
        println!(
            "  v{} {} {}",
            version.version,
            version.hash.dimmed(),
            version.actor.yellow()
        );
    }
    Ok(EXIT_SUCCESS)
}

async fn list_cases(server: &str, status: &str, prefix: &str) -> Result<u8, Box<dyn std::error::Error>> {
    let mut client = CaseStoreServiceClient::connect(server.to_string()).await?;
    let response = client
        .list_all_cases(Request::new(ListAllCasesRequest {
            status_filter: status.to_string(),
            name_prefix: prefix.to_string(),
        }))
        .await?
        .into_inner();
    for case in response.cases {
        println!("  {} [{}]", case.name.bright_cyan(), case.status.yellow());
    }
    Ok(EXIT_SUCCESS)
}

async fn get_attribute(server: &str, code: &str) -> Result<u8, Box<dyn std::error::Error>> {
    let mut client = DictionaryServiceClient::connect(server.to_string()).await?;
    let response = client
        .get_attribute(Request::new(GetAttributeRequest { code: code.to_string() }))
        .await?
        .into_inner();
    println!("{} {}", response.code.bright_cyan(), response.name);
    println!("  {} {}", "domain:".dimmed(), response.domain);
    println!("  {} {}", "type:".dimmed(), response.data_type);
    println!("  {} {}", "class:".dimmed(), response.class);
    Ok(EXIT_SUCCESS)
}

async fn list_attributes(server: &str, class: &str) -> Result<u8, Box<dyn std::error::Error>> {
    let mut client = DictionaryServiceClient::connect(server.to_string()).await?;
    let response = client
        .list_attributes(Request::new(ListAttributesRequest { class_filter: class.to_string() }))
        .await?
        .into_inner();
    for attr in response.attributes {
        println!("  {} [{}] {}", attr.code.bright_cyan(), attr.class.yellow(), attr.name);
    }
    Ok(EXIT_SUCCESS)
}

async fn get_document(server: &str, code: &str) -> Result<u8, Box<dyn std::error::Error>> {
    let mut client = DictionaryServiceClient::connect(server.to_string()).await?;
    let response = client
        .get_document(Request::new(GetDocumentRequest { code: code.to_string() }))
        .await?
        .into_inner();
    println!("{} {}", response.code.bright_cyan(), response.name);
    println!("  {} {}", "type:".dimmed(), response.doc_type);
    println!("  {} {}", "jurisdiction:".dimmed(), response.jurisdiction);
    Ok(EXIT_SUCCESS)
}

async fn list_documents(server: &str) -> Result<u8, Box<dyn std::error::Error>> {
    let mut client = DictionaryServiceClient::connect(server.to_string()).await?;
    let response = client
        .list_documents(Request::new(ListDocumentsRequest {}))
        .await?
        .into_inner();
    for doc in response.documents {
        println!("  {} [{}] {}", doc.code.bright_cyan(), doc.jurisdiction.yellow(), doc.name);
    }
    Ok(EXIT_SUCCESS)
}

async fn list_regulations(server: &str) -> Result<u8, Box<dyn std::error::Error>> {
    let mut client = OntologyServiceClient::connect(server.to_string()).await?;
    let response = client
        .list_regulations(Request::new(ListRegulationsRequest {}))
        .await?
        .into_inner();
    for reg in response.regulations {
        println!(
            "  {} {} [{}]",
            reg.code.bright_cyan(),
            reg.name,
            reg.jurisdictions.join(",").yellow()
        );
    }
    Ok(EXIT_SUCCESS)
}

async fn documents_by_regulation(server: &str, code: &str) -> Result<u8, Box<dyn std::error::Error>> {
    let mut client = OntologyServiceClient::connect(server.to_string()).await?;
    let response = client
        .list_documents_by_regulation(Request::new(ListDocumentsByRegulationRequest {
            regulation_code: code.to_string(),
        }))
        .await?
        .into_inner();
    for doc in response.documents {
        println!("  {} {}", doc.code.bright_cyan(), doc.name);
    }
    Ok(EXIT_SUCCESS)
}

async fn get_derivations(server: &str, code: &str) -> Result<u8, Box<dyn std::error::Error>> {
    let mut client = OntologyServiceClient::connect(server.to_string()).await?;
    let response = client
        .get_attribute_derivations(Request::new(GetAttributeDerivationsRequest {
            derived_code: code.to_string(),
        }))
        .await?
        .into_inner();
    for d in response.derivations {
        println!("  {} <- {}", d.derived.bright_cyan(), d.source.yellow());
    }
    Ok(EXIT_SUCCESS)
}

async fn get_lineage(server: &str, code: &str) -> Result<u8, Box<dyn std::error::Error>> {
    let mut client = OntologyServiceClient::connect(server.to_string()).await?;
    let response = client
        .get_attribute_lineage(Request::new(GetAttributeLineageRequest {
            attribute_code: code.to_string(),
        }))
        .await?
        .into_inner();
    println!("{} -> {}", code.bright_cyan(), response.lineage.join(" -> "));
    Ok(EXIT_SUCCESS)
}
