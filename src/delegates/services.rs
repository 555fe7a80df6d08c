use crate::delegates::dto::UpdateDelegateRequest;
use crate::delegates::repo::Delegate;

/// Merge a partial update into an existing delegate. Only non-empty fields
/// overwrite; `verified` moves false to true and never back.
pub fn apply_update(mut delegate: Delegate, update: UpdateDelegateRequest) -> Delegate {
    if !update.firstname.is_empty() {
        delegate.firstname = update.firstname;
    }
    if !update.lastname.is_empty() {
        delegate.lastname = update.lastname;
    }
    if !update.contact.is_empty() {
        delegate.contact = update.contact;
    }
    if !update.dateofbirth.is_empty() {
        delegate.dateofbirth = update.dateofbirth;
    }
    if !update.gender.is_empty() {
        delegate.gender = update.gender;
    }
    if !update.pastmuns.is_empty() {
        delegate.pastmuns = update.pastmuns;
    }
    if update.verified {
        delegate.verified = true;
    }
    delegate
}
