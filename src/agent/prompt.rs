//! System prompt templates for the agents.

use crate::tools::ToolRegistry;

/// Build the system prompt with tool definitions.
pub fn build_system_prompt(name: &str, description: &str, tools: &ToolRegistry) -> String {
    let tool_descriptions = tools
        .list_tools()
        .iter()
        .map(|t| format!("- **{}**: {}", t.name, t.description))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are {name}. {description}

## Your Tools

{tool_descriptions}

## Rules

1. **Use your tools** - Do not compute answers in your head. Call a tool and report what it returned.

2. **Report tool errors plainly** - If a tool reports an error, tell the user what went wrong and what input would work instead.

3. **Stay on task** - Only answer what was asked. Keep the final answer short and include the tool result verbatim."#,
        name = name,
        description = description,
        tool_descriptions = tool_descriptions
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::FindFactors;
    use std::sync::Arc;

    #[test]
    fn lists_every_tool() {
        let tools = ToolRegistry::new().with(Arc::new(FindFactors));
        let prompt = build_system_prompt("Factor Agent", "Finds factors.", &tools);
        assert!(prompt.starts_with("You are Factor Agent. Finds factors."));
        assert!(prompt.contains("- **find_factors**: "));
    }
}
