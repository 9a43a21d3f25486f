//! Prompt assembly.
//!
//! [`build_prompt`] is a pure function of the retrieved chunks and the
//! question. The template order is fixed: preamble, `CONTEXT:` with every
//! chunk verbatim, `USER QUERY:` with the question verbatim, the instruction
//! list, and a trailing `Answer:` cue.

/// Sentence the model is told to reply with when the context does not cover
/// the question. Callers compare answers against it literally.
pub const FALLBACK_ANSWER: &str = "I don't have this information yet.";

const PREAMBLE: &str = "You are an assistant that answers questions based on provided context.";

/// Separator placed between consecutive chunks in the `CONTEXT:` section.
pub const CHUNK_SEPARATOR: &str = "\n\n";

pub fn build_prompt(chunks: &[String], question: &str) -> String {
    let context = chunks.join(CHUNK_SEPARATOR);
    format!(
        "{PREAMBLE}\n\
         \n\
         CONTEXT:\n\
         {context}\n\
         \n\
         USER QUERY:\n\
         {question}\n\
         \n\
         Instructions:\n\
         - Answer the query using ONLY the information in the CONTEXT.\n\
         - If the CONTEXT does not contain enough information, reply exactly: \"{FALLBACK_ANSWER}\"\n\
         - Keep the answer concise, clear, and relevant.\n\
         - Do not make assumptions beyond the CONTEXT.\n\
         \n\
         Answer:\n"
    )
}

/// Whether `answer` is the fallback sentence. Surrounding whitespace is
/// ignored; any other difference is not.
pub fn is_fallback(answer: &str) -> bool {
    answer.trim() == FALLBACK_ANSWER
}
