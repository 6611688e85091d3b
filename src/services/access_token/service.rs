use std::sync::Arc;

use tracing::{debug, error};

use crate::repos::error::RepoError;
use crate::repos::token_store::{AccessToken, NewAccessToken, TokenStore};
use crate::services::access_token::error::{TokenError, TokenField};
use crate::services::access_token::secret::{TokenSecret, digest_secret};

pub const MAX_NAME_CHARS: usize = 255;
pub const MAX_DESCRIPTION_CHARS: usize = 512;

/// Issues, lists, finds and revokes access tokens for an owner, and resolves
/// presented secrets for the bearer filter.
#[derive(Clone)]
pub struct AccessTokenService {
    store: Arc<dyn TokenStore>,
}

impl std::fmt::Debug for AccessTokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessTokenService").finish_non_exhaustive()
    }
}

impl AccessTokenService {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }

    /// Issue a new token and return its secret.
    ///
    /// The secret is not recoverable afterwards; only its digest is stored.
    pub async fn issue(
        &self,
        owner_id: i64,
        name: &str,
        description: Option<&str>,
        expires_at: i64,
    ) -> Result<TokenSecret, TokenError> {
        validate_new_token(owner_id, name, description)?;

        if self.find(owner_id, name).await?.is_some() {
            debug!(owner_id, token_name = %name, "token name already taken");
            return Err(TokenError::duplicate(name));
        }

        let secret = TokenSecret::generate().map_err(|e| {
            error!(error = %e, "failed to generate token secret");
            TokenError::Entropy(e.to_string())
        })?;

        let new_token = NewAccessToken {
            owner_id,
            name: name.to_string(),
            description: description.map(str::to_string),
            secret_digest: secret.digest(),
            expires_at,
        };

        match self.store.insert(new_token).await {
            Ok(row) => {
                debug!(owner_id, token_id = row.id, token_name = %row.name, "token created");
                Ok(secret)
            }
            // Lost the race against a concurrent issue of the same name.
            Err(RepoError::Conflict) => {
                debug!(owner_id, token_name = %name, "insert rejected by uniqueness constraint");
                Err(TokenError::duplicate(name))
            }
            Err(RepoError::UnknownOwner) => Err(invalid_owner(owner_id)),
            Err(e) => {
                error!(owner_id, error = %e, "failed to insert token");
                Err(TokenError::Store(e))
            }
        }
    }

    pub async fn list(&self, owner_id: i64) -> Result<Vec<AccessToken>, TokenError> {
        self.store.list_by_owner(owner_id).await.map_err(|e| {
            error!(owner_id, error = %e, "failed to list tokens");
            TokenError::Store(e)
        })
    }

    pub async fn find(&self, owner_id: i64, name: &str) -> Result<Option<AccessToken>, TokenError> {
        self.store
            .find_by_owner_and_name(owner_id, name)
            .await
            .map_err(|e| {
                error!(owner_id, token_name = %name, error = %e, "failed to find token");
                TokenError::Store(e)
            })
    }

    /// Delete the owner's token called `name`.
    ///
    /// A token that disappears between lookup and delete (a competing revoke)
    /// is reported as not found, same as one that never existed.
    pub async fn revoke(&self, owner_id: i64, name: &str) -> Result<(), TokenError> {
        let Some(token) = self.find(owner_id, name).await? else {
            debug!(owner_id, token_name = %name, "token to revoke was not found");
            return Err(TokenError::not_found(name));
        };

        let deleted = self.store.delete(token.id).await.map_err(|e| {
            error!(owner_id, token_id = token.id, error = %e, "failed to delete token");
            TokenError::Store(e)
        })?;

        if !deleted {
            debug!(owner_id, token_id = token.id, "token already deleted by a concurrent revoke");
            return Err(TokenError::not_found(name));
        }

        debug!(owner_id, token_id = token.id, token_name = %name, "token revoked");
        Ok(())
    }

    /// Point lookup by presented secret. Owner independent.
    pub async fn resolve_by_secret(&self, secret: &str) -> Result<Option<AccessToken>, TokenError> {
        self.store
            .find_by_secret_digest(&digest_secret(secret))
            .await
            .map_err(|e| {
                error!(error = %e, "failed to resolve token by secret");
                TokenError::Store(e)
            })
    }
}

fn validate_new_token(
    owner_id: i64,
    name: &str,
    description: Option<&str>,
) -> Result<(), TokenError> {
    if owner_id <= 0 {
        return Err(invalid_owner(owner_id));
    }

    if name.chars().count() > MAX_NAME_CHARS {
        return Err(TokenError::validation(
            TokenField::Name,
            format!("Token name must not exceed {MAX_NAME_CHARS} characters."),
        ));
    }

    if let Some(description) = description
        && description.chars().count() > MAX_DESCRIPTION_CHARS
    {
        return Err(TokenError::validation(
            TokenField::Description,
            format!("Token description must not exceed {MAX_DESCRIPTION_CHARS} characters."),
        ));
    }

    Ok(())
}

fn invalid_owner(owner_id: i64) -> TokenError {
    TokenError::validation(
        TokenField::OwnerId,
        format!(
            "User id with value '{owner_id}' is not permitted. Access Token must be associated with a valid user-id."
        ),
    )
}
