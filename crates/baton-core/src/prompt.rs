//! Agent prompts: a role header, the section for the current interaction
//! mode, the agent's place in the flow, the goal, and the tool protocol.

use crate::models::{InteractionMode, COORDINATOR, CRITIC_COUNCIL};

/// Mode-specific prompt text. The addendum is only shown to the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeTemplate {
    pub section: &'static str,
    pub coordinator_addendum: Option<&'static str>,
}

// ─── Mode Sections ────────────────────────────────────────────────────────

const BRAINSTORMING_SECTION: &str = r#"## Mode: Brainstorming

The human is available. Explore the goal, surface open questions and agree on
a plan before anything is built. Do not write production code yet."#;

const BRAINSTORMING_ADDENDUM: &str = r#"### Coordinator
Ask the human with `ask_user_question` when a decision is theirs to make.
When the plan is settled, call `ask_user_work_gate` with a short summary of
the proposed work and wait for approval."#;

const BUILDING_SECTION: &str = r#"## Mode: Building

The plan is approved. Implement it. Keep changes scoped to your role and
record what you did with `update_workflow_state` (`addProgress`)."#;

const BUILDING_ADDENDUM: &str = r#"### Coordinator
Break the approved plan into work for the agents downstream of you and send
each one a message. Ask the human only when you are truly blocked."#;

const SELF_DRIVE_SECTION: &str = r#"## Mode: Self-drive

Nobody is watching. Make reasonable decisions yourself and keep going. Never
wait for a human answer: questions will not be answered."#;

const SELF_DRIVE_ADDENDUM: &str = r#"### Coordinator
Decide the plan yourself, delegate it, and set status `complete` once every
agent has reported back and the work is verified."#;

const CONTINUOUS_SECTION: &str = r#"## Mode: Continuous

This workflow re-runs whenever the goal changes, the human sends a steering
message, or a timer fires. Read the top of the goal for the newest
instructions, pick up where the previous cycle left off, and finish the cycle
with status `complete`."#;

const CONTINUOUS_ADDENDUM: &str = r#"### Coordinator
Check `peek_message_bus` and the progress log before planning; do not redo
work a previous cycle already finished."#;

const TOOL_PROTOCOL: &str = r#"## Tool Protocol

- `check_inbox` first: messages addressed to you are your instructions.
- `send_message(toAgent, body)` to hand work to another agent. The first line
  of the body is its subject.
- `update_todos` to track your work. You cannot finish while a todo is open.
- `update_workflow_state(status, task, addProgress)` to report. Set status
  `agent-done` when your part is finished.
- After `agent-done`, the system routes to the agent with the oldest unread
  message, else back to the coordinator."#;

pub fn mode_template(mode: InteractionMode) -> ModeTemplate {
    match mode {
        InteractionMode::Brainstorming => ModeTemplate {
            section: BRAINSTORMING_SECTION,
            coordinator_addendum: Some(BRAINSTORMING_ADDENDUM),
        },
        InteractionMode::Building => ModeTemplate {
            section: BUILDING_SECTION,
            coordinator_addendum: Some(BUILDING_ADDENDUM),
        },
        InteractionMode::SelfDrive => ModeTemplate {
            section: SELF_DRIVE_SECTION,
            coordinator_addendum: Some(SELF_DRIVE_ADDENDUM),
        },
        InteractionMode::Continuous => ModeTemplate {
            section: CONTINUOUS_SECTION,
            coordinator_addendum: Some(CONTINUOUS_ADDENDUM),
        },
    }
}

/// Everything `build_agent_prompt` needs to know about one turn.
#[derive(Debug, Clone)]
pub struct PromptContext<'a> {
    pub agent: &'a str,
    pub identity: &'a str,
    pub mode: InteractionMode,
    pub task: &'a str,
    /// Agents this one may hand work to
    pub successors: &'a [String],
    pub predecessors: &'a [String],
    pub goal_body: &'a str,
}

pub fn build_agent_prompt(ctx: &PromptContext<'_>) -> String {
    let is_coordinator = ctx.agent == COORDINATOR;
    let template = mode_template(ctx.mode);

    let mut prompt = if is_coordinator {
        format!(
            "# You are the {} ({})\n\nYou own the plan and route work between agents. \
             You are the only agent that talks to the human.\n\n",
            COORDINATOR, ctx.identity
        )
    } else if ctx.agent == CRITIC_COUNCIL {
        format!(
            "# You are the {} ({})\n\nReview the work done so far against the goal. \
             Report concrete problems to the coordinator.\n\n",
            CRITIC_COUNCIL, ctx.identity
        )
    } else {
        format!("# You are agent `{}` ({})\n\n", ctx.agent, ctx.identity)
    };

    prompt.push_str(template.section);
    prompt.push_str("\n\n");
    if is_coordinator {
        if let Some(addendum) = template.coordinator_addendum {
            prompt.push_str(addendum);
            prompt.push_str("\n\n");
        }
    }

    prompt.push_str("## Flow\n");
    if ctx.successors.is_empty() {
        prompt.push_str("- You are a terminal agent: report back instead of delegating.\n");
    } else {
        prompt.push_str(&format!("- You may hand work to: {}\n", ctx.successors.join(", ")));
    }
    if !ctx.predecessors.is_empty() {
        prompt.push_str(&format!("- Work reaches you from: {}\n", ctx.predecessors.join(", ")));
    }

    if !ctx.task.trim().is_empty() {
        prompt.push_str(&format!("\n## Current Task\n{}\n", ctx.task.trim()));
    }

    prompt.push_str(&format!("\n## Goal\n{}\n\n", ctx.goal_body.trim()));
    prompt.push_str(TOOL_PROTOCOL);
    prompt.push('\n');
    prompt
}
