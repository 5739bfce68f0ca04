// Interview prompt templates.
// All prompts for the interview endpoints are defined here.

use crate::llm_client::prompts::PromptTemplate;

pub const QUESTIONS_PROMPT: PromptTemplate = PromptTemplate::new(
    "Based on the following resume, generate a set of interview questions. \
The questions should be tailored to the candidate's experience and skills listed in the resume, \
and should be relevant to a typical job interview for a position in the related field.

Resume:
{resume_text}

Questions:",
);

pub const FOLLOW_UP_PROMPT: PromptTemplate = PromptTemplate::new(
    "Based on the following response from the candidate to a specific question, \
generate one or two creative follow-up questions to explore the candidate's experience \
or skills further. Act as a professional, strict HR interviewer: just ask the questions, \
grounded in the resume, and do not explain why you are asking them.

Question: {question}
Candidate's Response: {response}
Resume:
{resume_text}

Follow-Up Questions:",
);

pub const FEEDBACK_PROMPT: PromptTemplate = PromptTemplate::new(
    "Based on the following interview history, provide feedback on the candidate's performance. \
Highlight their strengths and areas for improvement to help them perform better in real-life interviews.

Interview History:
{interview_history}

Feedback:",
);
