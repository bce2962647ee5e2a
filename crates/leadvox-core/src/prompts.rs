//! Instruction prompts for the completion engine. Each embeds the utterance
//! verbatim and asks for a single JSON object back.

use chrono::NaiveDate;
use leadvox_schema::vocab;

use crate::dates::format_date;

const PREAMBLE: &str = "You are an AI assistant for EF San Juan, a custom millwork company.";

pub fn classification(text: &str) -> String {
    format!(
        r#"{PREAMBLE}
Analyze this voice note and classify what CRM action the speaker wants.

Transcription: "{text}"

Classify as ONE of these intents:
- new_lead: describes a brand-new potential customer (name, phone, property, project). Use this when the customer is being introduced for the first time.
- call_note: logs a call, meeting, site visit or other interaction with an EXISTING customer ("talked to", "called back", "met with").
- status_update: moves an existing lead to another pipeline stage ("mark Smith as qualified", "the Garcia job is lost").
- task: asks for a reminder or to-do ("remind me to", "follow up with", "schedule a measurement").
- unknown: not related to managing leads.

Disambiguation rules:
- "Got a call from <new person>, interested in ..." is new_lead, not call_note.
- A note logged against someone already in the CRM is call_note even if it mentions a project.
- If the note both logs a call and asks for a reminder, prefer call_note.

Respond in JSON format only:
{{
  "intent": "new_lead|call_note|status_update|task|unknown",
  "confidence": 0.0-1.0,
  "reasoning": "brief explanation",
  "referenced_entity": "name or phone of the existing customer referred to, or null"
}}"#
    )
}

pub fn new_lead(text: &str) -> String {
    format!(
        r#"{PREAMBLE}
Extract lead information from this voice transcription for creating a CRM record.

Transcription: "{text}"

Extract these fields if present (leave null if not mentioned):
- customer_name: Full name of the potential customer
- contact_phone: Phone number (format as XXX-XXX-XXXX if possible)
- contact_email: Email address
- property_address: Property/project address (include city if mentioned)
- lead_source: How they heard about us. Map to: {sources}
- job_segment: Type of project. Map to:
  - RR = Residential Remodel/Renovation
  - RN = Residential New Construction
  - CR = Commercial Remodel
  - CN = Commercial New Construction
- priority: If urgency mentioned. Map to: {priorities}
- initial_notes: Any other relevant details (what they want, referral source name, etc.)

Respond in JSON format only:
{{
  "customer_name": "string or null",
  "contact_phone": "string or null",
  "contact_email": "string or null",
  "property_address": "string or null",
  "lead_source": "string or null",
  "job_segment": "string or null",
  "priority": "string or null",
  "initial_notes": "string or null"
}}"#,
        sources = vocab::LEAD_SOURCES.listing(),
        priorities = vocab::PRIORITIES.listing(),
    )
}

pub fn call_note(text: &str, today: NaiveDate) -> String {
    format!(
        r#"{PREAMBLE}
Extract details of an interaction with an existing customer from this voice transcription.
Today's date is {today}.

Transcription: "{text}"

Extract these fields if present (leave null if not mentioned):
- lead_identifier: Name or phone number of the existing customer
- activity_type: One of: {types}
- subject: Short subject line for the interaction
- summary: What was discussed
- duration_minutes: Length of the interaction in minutes, as a number
- follow_up_date: Date of any agreed follow-up, as YYYY-MM-DD. Resolve relative dates ("tomorrow", "next Tuesday") against today's date.

Respond in JSON format only:
{{
  "lead_identifier": "string or null",
  "activity_type": "string or null",
  "subject": "string or null",
  "summary": "string or null",
  "duration_minutes": number or null,
  "follow_up_date": "YYYY-MM-DD or null"
}}"#,
        today = format_date(today),
        types = vocab::ACTIVITY_TYPES.listing(),
    )
}

pub fn status_update(text: &str) -> String {
    format!(
        r#"{PREAMBLE}
Extract a lead status change from this voice transcription.

Transcription: "{text}"

Extract these fields if present (leave null if not mentioned):
- lead_identifier: Name or phone number of the existing customer
- new_status: Must be exactly one of: {statuses}
- reason: Why the status is changing

Respond in JSON format only:
{{
  "lead_identifier": "string or null",
  "new_status": "string or null",
  "reason": "string or null"
}}"#,
        statuses = vocab::LEAD_STATUSES.listing(),
    )
}

pub fn task(text: &str, today: NaiveDate) -> String {
    format!(
        r#"{PREAMBLE}
Extract a follow-up task from this voice transcription.
Today's date is {today}.

Transcription: "{text}"

Extract these fields if present (leave null if not mentioned):
- lead_identifier: Name or phone number of the customer the task is about
- task_name: Short name for the task
- task_type: One of: {types}
- description: Details of what needs to be done
- due_date: When it is due, as YYYY-MM-DD. Resolve relative dates ("tomorrow", "next week", "Friday") against today's date.
- priority: One of: {priorities}

Respond in JSON format only:
{{
  "lead_identifier": "string or null",
  "task_name": "string or null",
  "task_type": "string or null",
  "description": "string or null",
  "due_date": "YYYY-MM-DD or null",
  "priority": "string or null"
}}"#,
        today = format_date(today),
        types = vocab::TASK_TYPES.listing(),
        priorities = vocab::PRIORITIES.listing(),
    )
}
