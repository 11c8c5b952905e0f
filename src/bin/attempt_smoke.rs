//! Drives one attempt against a running server through the public client.
//!
//! `attempt_smoke --base http://localhost:8000/api/v1 --token <jwt> --test <id> --student <id>`
//! answers every listed question with `--answer q=text` pairs, then completes.

use std::env;

use anyhow::{anyhow, Context, Result};
use wordcheck::client::{AnswerDraft, AttemptApi, HttpAttemptClient, LocalAttemptState};

struct Args {
    base: String,
    token: String,
    test_id: String,
    student_id: String,
    answers: Vec<AnswerDraft>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args()?;
    let client = HttpAttemptClient::new(&args.base, args.token)?;

    let started = client
        .start(&args.test_id, &args.student_id)
        .await
        .context("Failed to start attempt")?;
    let state = LocalAttemptState::restore(started);
    let attempt_id = state.attempt().id.clone();
    if let Some(notice) = state.resume_notice() {
        println!("{notice} ({} saved)", state.answers().len());
    }
    println!("attempt {attempt_id} at question {}", state.current_index());

    let attempt = client.submit_all(&attempt_id, &args.answers).await?;
    println!(
        "status={:?} correct={:?}/{} score={:?}",
        attempt.status, attempt.correct_answers, attempt.total_questions, attempt.score
    );

    let review = client.review(&attempt_id).await?;
    for question in review.questions {
        let mark = if question.is_correct { "OK" } else { "XX" };
        println!(
            "{mark} #{} {:?} expected {:?}",
            question.order_index, question.student_answer, question.correct_answer
        );
    }

    Ok(())
}

fn parse_args() -> Result<Args> {
    let mut base = env::var("WORDCHECK_SMOKE_BASE")
        .unwrap_or_else(|_| "http://localhost:8000/api/v1".to_string());
    let mut token = env::var("WORDCHECK_SMOKE_TOKEN").ok();
    let mut test_id = None;
    let mut student_id = None;
    let mut answers = Vec::new();

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--base" => base = args.next().ok_or_else(|| anyhow!("--base missing value"))?,
            "--token" => {
                token = Some(args.next().ok_or_else(|| anyhow!("--token missing value"))?);
            }
            "--test" => {
                test_id = Some(args.next().ok_or_else(|| anyhow!("--test missing value"))?);
            }
            "--student" => {
                student_id = Some(args.next().ok_or_else(|| anyhow!("--student missing value"))?);
            }
            "--answer" => {
                let pair = args.next().ok_or_else(|| anyhow!("--answer missing value"))?;
                let (question_id, answer) = pair
                    .split_once('=')
                    .ok_or_else(|| anyhow!("--answer expects question=text, got {pair}"))?;
                answers.push(AnswerDraft {
                    question_id: question_id.to_string(),
                    answer: answer.to_string(),
                });
            }
            _ => return Err(anyhow!("Unknown argument: {arg}")),
        }
    }

    Ok(Args {
        base,
        token: token.ok_or_else(|| anyhow!("--token or WORDCHECK_SMOKE_TOKEN is required"))?,
        test_id: test_id.ok_or_else(|| anyhow!("--test is required"))?,
        student_id: student_id.ok_or_else(|| anyhow!("--student is required"))?,
        answers,
    })
}
