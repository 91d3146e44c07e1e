use serde_json::json;

use super::BusResult;
use crate::models::{
    InteractionMode, Message, MultiChoiceQuestion, Question, WorkflowState, WorkflowStatus,
    COORDINATOR, HUMAN_PARTNER,
};

pub const WORK_GATE_APPROVE: &str = "Approve: start building";
pub const WORK_GATE_KEEP_BRAINSTORMING: &str = "Keep brainstorming";

pub fn ask_user_question(state: &mut WorkflowState, questions: Vec<Question>) -> BusResult {
    if questions.is_empty() {
        return Err("At least one question is required".to_string());
    }
    for (i, q) in questions.iter().enumerate() {
        if q.question.trim().is_empty() {
            return Err(format!("Question {} has no text", i + 1));
        }
        if q.choices.is_empty() {
            return Err(format!(
                "Question {} ('{}') needs at least one choice",
                i + 1,
                q.question
            ));
        }
    }

    let count = questions.len();
    state.human_message = questions[0].question.clone();
    state.multi_choice_question = Some(MultiChoiceQuestion {
        questions,
        ..Default::default()
    });
    state.status = WorkflowStatus::WaitingForHuman;
    tracing::info!("[MessageBus] {} question(s) waiting for human", count);

    Ok(json!({
        "status": state.status,
        "questions": count,
    }))
}

/// Ask the human to approve moving from brainstorming to building.
pub fn ask_user_work_gate(state: &mut WorkflowState, summary: &str) -> BusResult {
    let summary = summary.trim();
    if summary.is_empty() {
        return Err("A work gate needs a non-empty summary of the proposed work".to_string());
    }

    let question = Question {
        question: format!("Ready to start building?\n\n{}", summary),
        choices: vec![
            WORK_GATE_APPROVE.to_string(),
            WORK_GATE_KEEP_BRAINSTORMING.to_string(),
        ],
        ..Default::default()
    };
    state.human_message = question.question.clone();
    state.multi_choice_question = Some(MultiChoiceQuestion {
        questions: vec![question],
        is_work_gate: true,
        ..Default::default()
    });
    state.status = WorkflowStatus::WaitingForHuman;
    tracing::info!("[MessageBus] Work gate waiting for human");

    Ok(json!({ "status": state.status, "isWorkGate": true }))
}

/// Record the human's answers to the pending question and hand control back
/// to the coordinator. `answers` holds one entry per question.
pub fn answer_question(state: &mut WorkflowState, answers: &[String]) -> BusResult {
    let Some(pending) = state.multi_choice_question.take() else {
        return Err("No question is pending".to_string());
    };
    if answers.len() != pending.questions.len() {
        let expected = pending.questions.len();
        state.multi_choice_question = Some(pending);
        return Err(format!(
            "Expected {} answer(s), got {}",
            expected,
            answers.len()
        ));
    }

    let body = pending
        .questions
        .iter()
        .zip(answers)
        .map(|(q, a)| format!("Q: {}\nA: {}", q.question, a))
        .collect::<Vec<_>>()
        .join("\n\n");

    let approved = pending.is_work_gate
        && answers
            .first()
            .is_some_and(|a| a.trim() == WORK_GATE_APPROVE);
    if approved {
        state.interaction_mode = InteractionMode::Building;
    }

    let id = state.next_message_id();
    state.messages.push(Message::new(
        id,
        HUMAN_PARTNER.to_string(),
        COORDINATOR.to_string(),
        body,
    ));
    state.human_message.clear();
    state.status = WorkflowStatus::Working;
    state.current_agent = COORDINATOR.to_string();
    state.current_model = None;
    tracing::info!("[MessageBus] Human answered (work gate approved: {})", approved);

    Ok(json!({
        "messageId": id,
        "interactionMode": state.interaction_mode,
        "approved": approved,
    }))
}
