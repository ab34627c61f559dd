use crate::error::{Error, Result};
use crate::models::application::InternshipApplication;
use crate::models::offer::InternshipOffer;
use crate::models::user::User;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::fs;

const GROQ_CHAT_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const GROQ_MODEL: &str = "llama-3.1-8b-instant";
const MAX_CV_TEXT: usize = 4000;
const DEFAULT_SCORE: i32 = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub score: i32,
    pub analysis: String,
}

/// External scoring oracle: rates how well an applicant matches an offer.
/// Scoring is advisory; every failure is typed so callers can degrade
/// instead of blocking the pipeline.
#[derive(Clone)]
pub struct MatchService {
    client: Client,
    api_key: Option<String>,
}

impl MatchService {
    pub fn new(api_key: Option<String>, client: Client) -> Self {
        Self { client, api_key }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn score_application(
        &self,
        application: &InternshipApplication,
        offer: &InternshipOffer,
        student: &User,
        company_name: &str,
    ) -> Result<MatchResult> {
        let Some(api_key) = &self.api_key else {
            return Err(Error::ScoringUnavailable(
                "GROQ_API_KEY not configured".into(),
            ));
        };

        let cv_text = extract_cv_text(&application.cv_file).await;
        let prompt = build_prompt(application, offer, student, company_name, &cv_text);

        let payload = serde_json::json!({
            "model": GROQ_MODEL,
            "messages": [
                {
                    "role": "system",
                    "content": "You are an expert HR recruiter who analyzes candidate-job matches with emphasis on skills matching. Provide scores from 0-100 where skills are heavily weighted."
                },
                {"role": "user", "content": prompt}
            ],
            "temperature": 0.5,
            "max_tokens": 800
        });

        let res = self
            .client
            .post(GROQ_CHAT_URL)
            .bearer_auth(api_key)
            .json(&payload)
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| Error::Scoring(format!("Scoring request failed: {}", e)))?;

        if !res.status().is_success() {
            let status = res.status();
            return Err(Error::Scoring(format!("API Error: {}", status)));
        }

        let body: serde_json::Value = res
            .json()
            .await
            .map_err(|e| Error::Scoring(format!("Invalid scoring response: {}", e)))?;

        let analysis = body
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| Error::Scoring("Malformed scoring response".into()))?
            .to_string();

        let score = parse_match_score(&analysis);

        Ok(MatchResult { score, analysis })
    }
}

/// Pulls `MATCH SCORE: <n>` out of the analysis text; defaults to 50 and
/// clamps into [0, 100], matching the scorer contract.
pub fn parse_match_score(analysis: &str) -> i32 {
    let score = analysis.find("MATCH SCORE:").and_then(|pos| {
        let rest = analysis[pos + "MATCH SCORE:".len()..].trim_start();
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse::<i32>().ok()
    });
    score.unwrap_or(DEFAULT_SCORE).clamp(0, 100)
}

/// Comma-separated skill list parsed from the offer's free-text
/// requirements.
pub fn parse_required_skills(requirements: &str) -> Vec<String> {
    requirements
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn build_prompt(
    application: &InternshipApplication,
    offer: &InternshipOffer,
    student: &User,
    company_name: &str,
    cv_text: &str,
) -> String {
    let skills = offer
        .requirements
        .as_deref()
        .map(parse_required_skills)
        .unwrap_or_default();
    let skills_section = if skills.is_empty() {
        String::new()
    } else {
        format!(
            "\nREQUIRED SKILLS (Priority):\n{}\n",
            skills
                .iter()
                .map(|s| format!("- {}", s))
                .collect::<Vec<_>>()
                .join("\n")
        )
    };

    let job_requirements = format!(
        "JOB TITLE: {}\n\nCOMPANY: {}\n\nDESCRIPTION:\n{}\n{}\nADDITIONAL REQUIREMENTS:\n{}\n\nTYPE: {}\nLOCATION: {}\nDURATION: {}\nSTART DATE: {}\nEND DATE: {}",
        offer.title,
        company_name,
        offer.description,
        skills_section,
        offer.requirements.as_deref().unwrap_or("No additional requirements listed"),
        offer.offer_type,
        offer.location.as_deref().unwrap_or("Not specified"),
        offer.duration.as_deref().unwrap_or("Not specified"),
        offer.start_date,
        offer.end_date,
    );

    let applicant_profile = format!(
        "STUDENT INFORMATION:\n- Name: {}\n- Email: {}\n\nCOVER LETTER:\n{}\n\nCV CONTENT:\n{}",
        student.display_name(),
        student.email,
        application
            .cover_letter
            .as_deref()
            .unwrap_or("No cover letter provided"),
        if cv_text.is_empty() {
            "No CV text could be extracted"
        } else {
            cv_text
        },
    );

    format!(
        "You are an expert HR recruiter. Analyze how well this applicant matches the job requirements, with SPECIAL FOCUS on the required skills.\n\n{}\n\n---\n\n{}\n\nProvide your analysis in EXACTLY this format:\n\nMATCH SCORE: [number between 0-100]\n\nSKILLS MATCH:\n- [For each required skill, state if the candidate has it and provide evidence from their CV]\n\nSTRENGTHS:\n- [Specific strength 1]\n- [Specific strength 2]\n\nGAPS:\n- [Missing skill or requirement 1]\n\nRECOMMENDATION:\n[Brief recommendation: Strong Match / Good Match / Moderate Match / Weak Match / Not Recommended]\n\nBe specific and reference actual content from both the CV and job requirements.",
        job_requirements, applicant_profile
    )
}

/// Best-effort text extraction from the stored CV, truncated to a bounded
/// length. Extraction failure degrades to an empty string; scoring proceeds
/// on the cover letter alone.
async fn extract_cv_text(file_path: &str) -> String {
    let ext = std::path::Path::new(file_path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let text = match ext.as_str() {
        "pdf" => {
            let output = tokio::process::Command::new("pdftotext")
                .arg("-layout")
                .arg(file_path)
                .arg("-")
                .output()
                .await;
            match output {
                Ok(out) => String::from_utf8_lossy(&out.stdout).to_string(),
                Err(e) => {
                    tracing::warn!("Failed to run pdftotext on {}: {}", file_path, e);
                    String::new()
                }
            }
        }
        "txt" => fs::read_to_string(file_path).await.unwrap_or_default(),
        _ => String::new(),
    };

    truncate_chars(&text, MAX_CV_TEXT)
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
