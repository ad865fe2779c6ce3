use textwrap::dedent;
use tracing::{debug, info};

use crate::error::Result;
use crate::store::{CardTemplate, Collection, FieldRemap, NoteModel};

/// Card template bound to a note type. Formats are passed through untouched
/// apart from dedenting.
#[derive(Debug)]
pub struct TemplateData {
    pub name: &'static str,
    pub front: &'static str,
    pub back: &'static str,
}

/// Static definition of a note type this crate knows how to fill.
#[derive(Debug)]
pub struct ModelData {
    pub name: &'static str,
    pub fields: &'static [&'static str],
    pub templates: &'static [TemplateData],
    pub styling: &'static str,
    pub sort_field: &'static str,
    pub is_cloze: bool,
    /// Where a field of another note type lands in this one when no field
    /// has the same name. `None` discards the content.
    pub field_index: fn(to: &ModelData, from: &ModelData, from_field: &str) -> Option<usize>,
}

/// Default `field_index`: unmatched fields are dropped; the next sync
/// fills them back in from the wiki.
pub fn discard_field(_to: &ModelData, _from: &ModelData, _from_field: &str) -> Option<usize> {
    None
}

impl TemplateData {
    pub fn to_template(&self) -> CardTemplate {
        CardTemplate {
            name: self.name.to_string(),
            qfmt: dedent(self.front).trim().to_string(),
            afmt: dedent(self.back).trim().to_string(),
        }
    }
}

impl ModelData {
    pub fn sort_index(&self) -> Option<usize> {
        self.fields.iter().position(|f| *f == self.sort_field)
    }

    /// Build the collection-side note type. Don't add it twice: check
    /// `in_collection` first.
    pub fn to_model(&self) -> NoteModel {
        let mut model = NoteModel::new(self.name);
        for field in self.fields {
            model.add_field(field);
        }
        for template in self.templates {
            model.add_template(template.to_template());
        }
        model.set_css(dedent(self.styling).trim().to_string());
        model.set_sort_field(self.sort_index().unwrap_or_default());
        if self.is_cloze {
            model.mark_cloze();
        }
        model
    }

    pub fn in_collection(&self, col: &dyn Collection) -> Result<bool> {
        Ok(col.model_by_name(self.name)?.is_some())
    }

    /// Map each of this type's field indices onto `other`'s, for changing a
    /// note of this type into one of `other`. Same-named fields match;
    /// everything else is up to `other.field_index`.
    pub fn field_remap(&self, other: &ModelData) -> FieldRemap {
        self.fields
            .iter()
            .enumerate()
            .map(|(idx, field)| {
                let target = other
                    .fields
                    .iter()
                    .position(|f| f == field)
                    .or_else(|| (other.field_index)(other, self, field));
                (idx, target)
            })
            .collect()
    }
}

macro_rules! concat_footer {
    ($body:literal) => {
        concat!(
            $body,
            r#"
            <div class="note-id">
                {{#Permalink}}
                    [<a href="{{text:Permalink}}">{{Wiki}}/{{Reference}}</a> {{ID}}]
                {{/Permalink}}
                {{^Permalink}}
                    [{{Wiki}}/{{Reference}} {{ID}}]
                {{/Permalink}}
            </div>
"#
        )
    };
}

pub static QUESTION_ANSWER: ModelData = ModelData {
    name: "TiddlyRemember Q&A v1",
    fields: &["Question", "Answer", "ID", "Wiki", "Reference", "Permalink"],
    templates: &[TemplateData {
        name: "Forward",
        front: r#"
            {{Question}}
        "#,
        back: concat_footer!(
            r#"
            {{FrontSide}}

            <hr id=answer>

            {{Answer}}
"#
        ),
    }],
    styling: r#"
        .card {
            font-family: arial;
            font-size: 20px;
            text-align: center;
            color: black;
            background-color: white;
        }

        .note-id {
            font-size: 70%;
            margin-top: 1ex;
            text-align: right;
            color: grey;
        }

        .note-id a {
            color: grey;
        }
    "#,
    sort_field: "Question",
    is_cloze: false,
    field_index: discard_field,
};

pub static CLOZE: ModelData = ModelData {
    name: "TiddlyRemember Cloze v1",
    fields: &["Text", "ID", "Wiki", "Reference", "Permalink"],
    templates: &[TemplateData {
        name: "Cloze",
        front: r#"
            {{cloze:Text}}
        "#,
        back: concat_footer!(
            r#"
            {{cloze:Text}}
"#
        ),
    }],
    styling: r#"
        .card {
            font-family: arial;
            font-size: 20px;
            text-align: center;
            color: black;
            background-color: white;
        }

        .cloze {
            font-weight: bold;
            color: blue;
        }

        .nightMode .cloze {
            filter: invert(85%);
        }

        .note-id {
            font-size: 70%;
            margin-top: 1ex;
            text-align: right;
            color: grey;
        }

        .note-id a {
            color: grey;
        }
    "#,
    sort_field: "Text",
    is_cloze: true,
    field_index: discard_field,
};

static NOTE_TYPES: [&ModelData; 2] = [&QUESTION_ANSWER, &CLOZE];

pub fn all_note_types() -> &'static [&'static ModelData] {
    &NOTE_TYPES
}

pub fn by_name(name: &str) -> Option<&'static ModelData> {
    NOTE_TYPES.iter().copied().find(|m| m.name == name)
}

/// Add every catalog note type the collection doesn't have yet. Safe to
/// call on every startup.
pub fn ensure_note_types(col: &mut dyn Collection) -> Result<usize> {
    let mut added = 0;
    for model in all_note_types() {
        if model.in_collection(col)? {
            debug!("Note type {:?} already present", model.name);
            continue;
        }
        col.add_model(model.to_model())?;
        info!("Added note type {:?}", model.name);
        added += 1;
    }
    Ok(added)
}
