//! Research workflow prompt templates
//!
//! One template per model-facing step:
//! - Query writer: turns the research topic into diverse web search queries
//! - Web searcher: grounded search and summary for a single query
//! - Reflection: decides whether the gathered summaries answer the topic
//! - Answer: final synthesis with citations

use chrono::Local;

/// Prompt templates for the research workflow
pub struct ResearchPrompts;

impl ResearchPrompts {
    /// Today's date as shown to the model, e.g. "March 4, 2025"
    pub fn current_date() -> String {
        Local::now().format("%B %-d, %Y").to_string()
    }

    /// Query writer prompt asking for `count` search queries
    pub fn query_writer(topic: &str, count: usize, date: &str) -> String {
        format!(
            r#"Your goal is to generate sophisticated and diverse web search queries. These queries are intended for an advanced automated web research tool capable of analyzing complex results, following links, and synthesizing information.

Instructions:
- Always prefer a single search query, only add another query if the original question requests multiple aspects or elements and one query is not enough.
- Each query should focus on one specific aspect of the original question.
- Don't produce more than {count} queries.
- Queries should be diverse, if the topic is broad, generate more than 1 query.
- Don't generate multiple similar queries, 1 is enough.
- Query should ensure that the most current information is gathered. The current date is {date}.

Format:
- Format your response as a JSON object with ALL of these exact keys:
   - "query": a list of objects, each with a "query" string and a "rationale" string explaining why the query is relevant

Example:

Topic: What revenue grew more last year apple stock or the number of people buying an iphone
```json
{{
    "query": [
        {{"query": "Apple total revenue growth fiscal year 2024", "rationale": "Establishes Apple's overall revenue trend."}},
        {{"query": "iPhone unit sales growth fiscal year 2024", "rationale": "Measures the change in the number of iPhones sold."}},
        {{"query": "Apple stock price growth fiscal year 2024", "rationale": "Provides the stock performance for the comparison."}}
    ]
}}
```

Context: {topic}"#
        )
    }

    /// Grounded web search prompt for one query
    pub fn web_searcher(query: &str, date: &str) -> String {
        format!(
            r#"Conduct targeted Google Searches to gather the most recent, credible information on "{query}" and synthesize it into a verifiable text artifact.

Instructions:
- Query should ensure that the most current information is gathered. The current date is {date}.
- Conduct multiple, diverse searches to gather comprehensive information.
- Consolidate key findings while meticulously tracking the source(s) for each specific piece of information.
- The output should be a well-written summary or report based on your search findings.
- Only include the information found in the search results, don't make up any information.

Research Topic:
{query}
"#
        )
    }

    /// Reflection prompt over the concatenated research summaries
    pub fn reflection(topic: &str, date: &str, summaries: &str) -> String {
        format!(
            r#"You are an expert research assistant analyzing summaries about "{topic}".

The current date is {date}.

Instructions:
- Identify knowledge gaps or areas that need deeper exploration and generate a follow-up query (1 or multiple).
- If the provided summaries are sufficient to answer the user's question, don't generate a follow-up query.
- If there is a knowledge gap, generate a follow-up query that would help expand your understanding.
- Focus on technical details, implementation specifics, or emerging trends that weren't fully covered.

Requirements:
- Ensure the follow-up query is self-contained and includes necessary context for web search.

Output Format:
- Format your response as a JSON object with these exact keys:
   - "is_sufficient": true or false
   - "knowledge_gap": describe what information is missing or needs clarification ("" when sufficient)
   - "follow_up_queries": write specific questions to address this gap ([] when sufficient)

Example:
```json
{{
    "is_sufficient": false,
    "knowledge_gap": "The summary lacks information about performance metrics and benchmarks",
    "follow_up_queries": ["What are typical performance benchmarks and metrics used to evaluate [specific technology]?"]
}}
```

Reflect carefully on the Summaries to identify knowledge gaps and produce a follow-up query. Then, produce your output following this JSON format:

Summaries:
{summaries}
"#
        )
    }

    /// Final answer prompt
    pub fn answer(topic: &str, summaries: &str, date: &str) -> String {
        format!(
            r#"Generate a high-quality answer to the user's question based on the provided summaries.

Instructions:
- The current date is {date}.
- You are the final step of a multi-step research process, don't mention that you are the final step.
- You have access to all the information gathered from the previous steps.
- You have access to the user's question.
- Generate a high-quality answer to the user's question based on the provided summaries and the user's question.
- You MUST include all the citations from the summaries in the answer correctly.

User Context:
- {topic}

Summaries:
{summaries}"#
        )
    }
}
