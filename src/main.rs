use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sanoscribe::coder::{self, AgeUnit, CotationSheet};
use sanoscribe::config::{self, Config};
use sanoscribe::documents;
use sanoscribe::models::{AiAnalysis, Consultation, Patient};
use sanoscribe::pipeline::{
    analyze_or_fallback, ArretDates, ArretPatient, ArretRequest, ConsultApiClient,
    ConsultationData, ConsultationFlow, RemoteAnalyzer, StructureResponse,
};
use sanoscribe::recording::{AudioPayload, CpalCapture, Recorder};
use sanoscribe::store::ConsultationStore;

#[derive(Parser)]
#[command(name = "sanoscribe", version, about = "Assistant de consultation médicale")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Pipeline complet : transcription, structuration, relance, analyse IA
    Consult {
        /// Fichier audio de la consultation
        #[arg(long)]
        audio: PathBuf,
        /// Nom du patient (ajouté à la liste de la session)
        #[arg(long, default_value = "Patient")]
        patient: String,
        /// Ne pas lancer l'analyse IA après la structuration
        #[arg(long)]
        no_analyze: bool,
    },
    /// Dictée vocale via le webhook (remplit directement les champs)
    Dictate {
        /// Fichier audio ; à défaut, enregistre au microphone
        #[arg(long)]
        audio: Option<PathBuf>,
        /// Durée d'enregistrement au microphone, en secondes
        #[arg(long, default_value_t = 10)]
        seconds: u64,
    },
    /// Analyse IA sur des champs saisis à la main
    Analyze {
        #[arg(long)]
        motif: String,
        #[arg(long)]
        symptomes: String,
        #[arg(long, default_value = "")]
        examen: String,
    },
    /// Génère l'arrêt de travail (PDF)
    Arret {
        #[arg(long)]
        nom: String,
        #[arg(long)]
        prenom: String,
        #[arg(long, default_value = "")]
        naissance: String,
        #[arg(long)]
        debut: String,
        #[arg(long)]
        fin: String,
        #[arg(long, default_value = "")]
        motif: String,
    },
    /// Cotation NGAP : suggestion de code et total des actes
    Cotation {
        #[arg(long)]
        age: u32,
        #[arg(long, default_value = "ans")]
        unite: AgeUnit,
        #[arg(long)]
        motif: String,
        /// Geste complémentaire à ajouter (répétable)
        #[arg(long = "geste")]
        gestes: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    tracing::info!("{} v{}", config::APP_NAME, config::APP_VERSION);

    // Every stage failure surfaces here as a single message and nothing
    // is retried — the CLI analog of the UI's transient notification.
    if let Err(error) = run(cli.command, &config).await {
        eprintln!("Erreur : {error:#}");
        std::process::exit(1);
    }
}

async fn run(command: Command, config: &Config) -> anyhow::Result<()> {
    match command {
        Command::Consult {
            audio,
            patient,
            no_analyze,
        } => run_consult(config, &audio, &patient, no_analyze).await,
        Command::Dictate { audio, seconds } => run_dictate(config, audio, seconds).await,
        Command::Analyze {
            motif,
            symptomes,
            examen,
        } => run_analyze(config, &motif, &symptomes, &examen).await,
        Command::Arret {
            nom,
            prenom,
            naissance,
            debut,
            fin,
            motif,
        } => run_arret(config, nom, prenom, naissance, debut, fin, motif).await,
        Command::Cotation {
            age,
            unite,
            motif,
            gestes,
        } => run_cotation(age, unite, &motif, &gestes),
    }
}

async fn run_consult(
    config: &Config,
    audio_path: &Path,
    patient_name: &str,
    no_analyze: bool,
) -> anyhow::Result<()> {
    let client = ConsultApiClient::new(config);
    let audio = AudioPayload::from_file(audio_path)?;
    let mut flow = ConsultationFlow::new();

    println!("🎙 Transcription…");
    let transcript = flow.run_transcription(&client, &audio).await?.to_string();
    println!("Texte transcrit :\n{transcript}\n");

    println!("🩺 Structuration…");
    let fields = flow.run_structuring(&client).await?.clone();
    print_fields(&fields);
    if let Some(question) = flow.clarification() {
        println!("⚠ Relance IA : {question}\n");
    }

    let store = ConsultationStore::new(Box::new(RemoteAnalyzer::new(config)));
    let mut patient = Patient::new(patient_name);
    let consultation =
        Consultation::new(patient.id, &fields.motif, &fields.symptomes, &fields.examen);
    patient.consultations.push(consultation.clone());
    store.add_patient(patient.clone())?;
    store.set_current_patient(Some(patient))?;
    store.set_current_consultation(Some(consultation.clone()))?;

    if !no_analyze {
        println!("🧠 Analyse IA…");
        let analysis = store.analyze_with_ai(&consultation).await?;
        print_analysis(&analysis);
        store.update_consultation(consultation.with_analysis(analysis))?;
    }
    Ok(())
}

async fn run_dictate(
    config: &Config,
    audio: Option<PathBuf>,
    seconds: u64,
) -> anyhow::Result<()> {
    let client = ConsultApiClient::new(config);
    let payload = match audio {
        Some(path) => AudioPayload::from_file(&path)?,
        None => record_from_microphone(seconds)?,
    };

    println!("📝 Envoi vers le webhook en cours…");
    let result = client.dictate(&payload).await?;
    println!("Motif : {}", result.motif);
    println!("Symptômes : {}", result.symptomes);
    println!("Examen : {}", result.examen);
    println!("Antécédents : {}", result.antecedents);
    println!("✅ Dictée analysée, les champs ont été complétés automatiquement.");
    Ok(())
}

fn record_from_microphone(seconds: u64) -> anyhow::Result<AudioPayload> {
    let mut recorder = Recorder::new(CpalCapture::new()?);
    recorder.start()?;
    println!("🎙️ Enregistrement en cours… ({seconds}s)");
    std::thread::sleep(Duration::from_secs(seconds));
    Ok(recorder.stop()?)
}

async fn run_analyze(
    config: &Config,
    motif: &str,
    symptomes: &str,
    examen: &str,
) -> anyhow::Result<()> {
    let provider = RemoteAnalyzer::new(config);
    let data = ConsultationData::new(motif, symptomes, examen);
    let analysis = analyze_or_fallback(&provider, &data).await?;
    print_analysis(&analysis);
    Ok(())
}

async fn run_arret(
    config: &Config,
    nom: String,
    prenom: String,
    naissance: String,
    debut: String,
    fin: String,
    motif: String,
) -> anyhow::Result<()> {
    let client = ConsultApiClient::new(config);
    let request = ArretRequest {
        patient: ArretPatient {
            nom,
            prenom,
            date_naissance: naissance,
        },
        motif,
        dates: ArretDates { debut, fin },
    };

    println!("📝 Génération de l'arrêt de travail…");
    let pdf = client.generate_arret(&request).await?;
    let path = documents::save_arret_pdf(
        &config.documents_dir,
        &pdf,
        &request.patient.nom,
        &request.dates.debut,
    )?;
    println!("✅ Arrêt de travail généré : {}", path.display());
    Ok(())
}

fn run_cotation(age: u32, unite: AgeUnit, motif: &str, gestes: &[String]) -> anyhow::Result<()> {
    let suggested = coder::suggest_code(age, unite, motif);
    let mut sheet = CotationSheet::new();

    if suggested.is_empty() {
        println!("Aucune suggestion (motif vide).");
    } else {
        sheet.select_primary(suggested);
        if let Some(primary) = sheet.primary() {
            println!(
                "Code suggéré : {} — {} ({}€)",
                primary.code, primary.libelle, primary.tarif
            );
        }
    }

    for geste in gestes {
        if !sheet.toggle_geste(geste) {
            eprintln!("Code NGAP inconnu ignoré : {geste}");
        }
    }
    for geste in sheet.gestes() {
        println!("Geste : {} — {} (+{}€)", geste.code, geste.libelle, geste.tarif);
    }
    println!("Total : {:.2}€", sheet.total());
    Ok(())
}

fn print_fields(fields: &StructureResponse) {
    println!("── Synthèse SOAP ──");
    println!("S - Motif : {}", fields.motif);
    println!("S - Symptômes : {}", fields.symptomes);
    println!("O - Examen : {}", fields.examen);
    println!("Antécédents : {}", fields.antecedents);
    println!("A/P - Analyse & Plan : {}", fields.plan);
    if !fields.synthese_soap.is_empty() {
        println!("\n{}", fields.synthese_soap);
    }

    println!("\n── Scores & Alertes ──");
    println!("NEWS2 : {}", fields.news2);
    println!("Drapeaux rouges : {}", fields.drapeaux_rouges);
    println!("Code NGAP : {}", fields.code_ngap);

    if !fields.diagnostics.is_empty() {
        println!("\n── Diagnostics ──");
        for diagnostic in &fields.diagnostics {
            println!(
                "{:<8} {} ({}%)",
                diagnostic.cim10, diagnostic.libelle, diagnostic.prob
            );
        }
    }

    if !fields.ordonnance.is_empty() {
        println!("\n── Ordonnance ──\n{}", fields.ordonnance);
    }
    if !fields.courrier.is_empty() {
        println!("\n── Courrier ──\n{}", fields.courrier);
    }
    if !fields.fiche_etp.is_empty() {
        println!("\n── Fiche Patient ──\n{}", fields.fiche_etp);
    }
    println!();
}

fn print_analysis(analysis: &AiAnalysis) {
    println!("── Synthèse clinique (SOAP) ──");
    println!("{}", analysis.clinical_synthesis);
    println!("Confiance IA : {}%", analysis.confidence_percent());

    println!("\n── Diagnostic différentiel ──");
    for (index, diagnosis) in analysis.differential_diagnosis.iter().enumerate() {
        if index == 0 {
            println!("1. {diagnosis} (diagnostic principal probable)");
        } else {
            println!("{}. {diagnosis}", index + 1);
        }
    }

    println!("\n── Traitement recommandé ──");
    println!("{}", analysis.recommended_treatment);
    println!("✅ Analyse IA terminée avec succès !");
}
