//! Prompt construction for the planning and synthesis phases, plus the
//! built-in sub-agent roster used when config defines none.

use super::types::{SubAgentConfig, SubAgentResult};

/// System prompt for the planning request.
///
/// Lists every registered agent and pins the reply format to a single JSON
/// object so the reply can be parsed directly.
pub fn build_planner_prompt(agents: &[SubAgentConfig]) -> String {
    let mut prompt = String::with_capacity(1024);

    prompt.push_str(
        "You are the planner of a multi-agent system. Break the user's request into \
         tasks and assign each task to one of the available agents.\n\n",
    );

    prompt.push_str("## Available Agents\n\n");
    for agent in agents {
        prompt.push_str(&format!("- **{}**: {}\n", agent.name, first_line(&agent.role_prompt)));
    }
    prompt.push('\n');

    prompt.push_str(
        "## Response Format\n\n\
         Reply with ONLY a JSON object, no commentary, in exactly this shape:\n\n\
         {\"steps\": [{\"agent\": \"<agent name>\", \"prompt\": \"<self-contained instructions>\"}], \
         \"parallel\": <true|false>}\n\n\
         ## Rules\n\n\
         1. Use only agent names from the list above.\n\
         2. Each prompt must be self-contained: agents cannot see each other's work \
         or the original request.\n\
         3. Set \"parallel\" to true only when no step depends on another step's output.\n\
         4. Use as few steps as the request needs; at least one.\n",
    );

    prompt
}

/// System prompt for the synthesis request.
pub const SYNTHESIZER_PROMPT: &str = "You combine the work of several specialist agents into \
one final answer for the user. Resolve overlaps and contradictions, keep what is useful, and \
mention any part of the request that could not be completed because an agent failed.";

/// User message for the synthesis request: the original request followed by
/// every result, failures included.
pub fn build_synthesis_message(user_request: &str, results: &[SubAgentResult]) -> String {
    let mut message = String::with_capacity(1024);

    message.push_str("## Original Request\n\n");
    message.push_str(user_request);
    message.push_str("\n\n## Agent Results\n");

    for (i, result) in results.iter().enumerate() {
        message.push_str(&format!("\n### {}. {}\n\n", i + 1, result.agent_name));
        match &result.error {
            Some(error) => {
                message.push_str(&format!("FAILED: {error}\n"));
                if !result.output.is_empty() {
                    message.push_str(&format!("Partial output:\n{}\n", result.output));
                }
            }
            None => {
                message.push_str(&result.output);
                message.push('\n');
            }
        }
    }

    message.push_str("\nWrite the consolidated answer to the original request.");
    message
}

/// Agents registered when the config defines none.
pub fn default_agents() -> Vec<SubAgentConfig> {
    vec![
        SubAgentConfig::new(
            "researcher",
            "Researches a topic and reports concise, factual findings.\n\
             You are a careful researcher. Answer with well-organized facts, note \
             uncertainty explicitly, and do not speculate beyond what you know.",
        )
        .with_tools(Vec::<String>::new()),
        SubAgentConfig::new(
            "writer",
            "Turns notes or requirements into clear, polished prose.\n\
             You are a skilled technical writer. Produce clear, well-structured text \
             that directly addresses the instructions.",
        )
        .with_tools(Vec::<String>::new()),
        SubAgentConfig::new(
            "reviewer",
            "Critiques a draft or plan and lists concrete improvements.\n\
             You are a meticulous reviewer. Identify errors, gaps, and risks, and \
             propose specific fixes in priority order.",
        )
        .with_tools(Vec::<String>::new()),
    ]
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default().trim()
}
