use clap::{crate_description, crate_version};
use paperclip::v2::models::{DefaultApiRaw, Info};

use crate::APP_TITLE;

pub fn default_spec() -> DefaultApiRaw {
    DefaultApiRaw {
        info: Info {
            title: APP_TITLE.to_owned(),
            description: match crate_description!() {
                "" => None,
                d => Some(d.to_owned()),
            },
            version: crate_version!().to_owned(),
            ..Default::default()
        },
        ..Default::default()
    }
}
